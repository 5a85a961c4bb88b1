use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use borsh::BorshDeserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::types::RawTransaction;
use crate::models::{DomainEvent, GameSettledEvent, PoolAction, PoolChangeEvent};

/// Prefix of the log line carrying an emitted event.
const PROGRAM_DATA_PREFIX: &str = "Program data: ";

const DISCRIMINATOR_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("transaction {0} has no block time")]
    MissingBlockTime(String),

    #[error("invalid base64 event payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("malformed {event} payload: {source}")]
    Malformed {
        event: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown pool action {0}")]
    UnknownPoolAction(u8),
}

/// Maps one raw transaction to the program events it emitted.
pub trait EventDecoder: Send + Sync {
    fn decode(&self, tx: &RawTransaction) -> Result<Vec<DomainEvent>, DecodeError>;
}

/// `GameSettled` as serialized by the program (Borsh, declaration order).
#[derive(Debug, BorshDeserialize)]
#[cfg_attr(test, derive(borsh::BorshSerialize))]
struct GameSettledData {
    user: [u8; 32],
    pool: [u8; 32],
    token_mint: [u8; 32],
    creator: [u8; 32],
    creator_fee: u64,
    whisky_fee: u64,
    pool_fee: u64,
    jackpot_fee: u64,
    wager: u64,
    payout: u64,
    multiplier_bps: u32,
    jackpot_payout_to_user: u64,
    pool_liquidity: u64,
    rng_seed: String,
    client_seed: String,
    nonce: u64,
    bet: Vec<u32>,
    next_rng_seed_hashed: String,
    metadata: String,
}

/// `PoolChange` as serialized by the program. `action` is 0 = deposit,
/// 1 = withdraw.
#[derive(Debug, BorshDeserialize)]
#[cfg_attr(test, derive(borsh::BorshSerialize))]
struct PoolChangeData {
    user: [u8; 32],
    pool: [u8; 32],
    token_mint: [u8; 32],
    action: u8,
    amount: u64,
    lp_supply: u64,
    post_liquidity: u64,
}

/// Decodes Anchor `emit!` events from `Program data:` log lines.
///
/// Each payload is `sha256("event:<Name>")[..8]` followed by the Borsh
/// encoding of the event.
#[derive(Debug, Clone)]
pub struct AnchorEventDecoder {
    game_settled: [u8; DISCRIMINATOR_LEN],
    pool_change: [u8; DISCRIMINATOR_LEN],
}

impl Default for AnchorEventDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl AnchorEventDecoder {
    pub fn new() -> Self {
        Self {
            game_settled: event_discriminator("GameSettled"),
            pool_change: event_discriminator("PoolChange"),
        }
    }
}

impl EventDecoder for AnchorEventDecoder {
    fn decode(&self, tx: &RawTransaction) -> Result<Vec<DomainEvent>, DecodeError> {
        if tx.failed {
            return Ok(Vec::new());
        }

        let mut events = Vec::new();
        for line in &tx.log_messages {
            let Some(data) = line.strip_prefix(PROGRAM_DATA_PREFIX) else {
                continue;
            };
            let bytes = BASE64.decode(data.trim())?;
            if bytes.len() < DISCRIMINATOR_LEN {
                continue;
            }
            let (discriminator, body) = bytes.split_at(DISCRIMINATOR_LEN);

            // Block time is only required once the tx actually carries an event.
            let block_time = || {
                tx.block_time
                    .ok_or_else(|| DecodeError::MissingBlockTime(tx.signature.clone()))
            };

            if discriminator == self.game_settled {
                let data = borsh_body::<GameSettledData>(body, "GameSettled")?;
                events.push(DomainEvent::GameSettled(game_settled(
                    data,
                    &tx.signature,
                    block_time()?,
                )));
            } else if discriminator == self.pool_change {
                let data = borsh_body::<PoolChangeData>(body, "PoolChange")?;
                events.push(DomainEvent::PoolChange(pool_change(
                    data,
                    &tx.signature,
                    block_time()?,
                )?));
            }
        }

        Ok(events)
    }
}

/// First 8 bytes of `sha256("event:<name>")`.
pub fn event_discriminator(name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let hash = Sha256::digest(format!("event:{name}").as_bytes());
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&hash[..DISCRIMINATOR_LEN]);
    out
}

/// Base58 text form of a 32-byte account key.
pub fn pubkey_string(key: &[u8; 32]) -> String {
    bs58::encode(key).into_string()
}

fn borsh_body<T: BorshDeserialize>(body: &[u8], event: &'static str) -> Result<T, DecodeError> {
    T::try_from_slice(body).map_err(|source| DecodeError::Malformed { event, source })
}

fn game_settled(data: GameSettledData, signature: &str, block_time: i64) -> GameSettledEvent {
    GameSettledEvent {
        signature: signature.to_string(),
        block_time,
        user: pubkey_string(&data.user),
        pool: pubkey_string(&data.pool),
        token_mint: pubkey_string(&data.token_mint),
        creator: pubkey_string(&data.creator),
        creator_fee: data.creator_fee,
        whisky_fee: data.whisky_fee,
        pool_fee: data.pool_fee,
        jackpot_fee: data.jackpot_fee,
        wager: data.wager,
        payout: data.payout,
        multiplier_bps: data.multiplier_bps,
        jackpot_payout_to_user: data.jackpot_payout_to_user,
        pool_liquidity: data.pool_liquidity,
        rng_seed: data.rng_seed,
        client_seed: data.client_seed,
        nonce: data.nonce,
        bet: data.bet,
        next_rng_seed_hashed: data.next_rng_seed_hashed,
        metadata: data.metadata,
    }
}

fn pool_change(
    data: PoolChangeData,
    signature: &str,
    block_time: i64,
) -> Result<PoolChangeEvent, DecodeError> {
    let action = match data.action {
        0 => PoolAction::Deposit,
        1 => PoolAction::Withdraw,
        other => return Err(DecodeError::UnknownPoolAction(other)),
    };

    Ok(PoolChangeEvent {
        signature: signature.to_string(),
        block_time,
        user: pubkey_string(&data.user),
        pool: pubkey_string(&data.pool),
        token_mint: pubkey_string(&data.token_mint),
        action,
        amount: data.amount,
        lp_supply: data.lp_supply,
        post_liquidity: data.post_liquidity,
    })
}
