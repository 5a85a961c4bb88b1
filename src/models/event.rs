use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// PoolAction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolAction {
    Deposit,
    Withdraw,
}

impl PoolAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolAction::Deposit => "deposit",
            PoolAction::Withdraw => "withdraw",
        }
    }
}

impl fmt::Display for PoolAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Decoded program events
// ---------------------------------------------------------------------------

/// A settled game as emitted by the program. Amounts are raw token units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSettledEvent {
    pub signature: String,
    pub block_time: i64,
    pub user: String,
    pub pool: String,
    pub token_mint: String,
    pub creator: String,
    pub creator_fee: u64,
    pub whisky_fee: u64,
    pub pool_fee: u64,
    pub jackpot_fee: u64,
    pub wager: u64,
    pub payout: u64,
    pub multiplier_bps: u32,
    pub jackpot_payout_to_user: u64,
    pub pool_liquidity: u64,
    pub rng_seed: String,
    pub client_seed: String,
    pub nonce: u64,
    pub bet: Vec<u32>,
    pub next_rng_seed_hashed: String,
    pub metadata: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolChangeEvent {
    pub signature: String,
    pub block_time: i64,
    pub user: String,
    pub pool: String,
    pub token_mint: String,
    pub action: PoolAction,
    pub amount: u64,
    pub lp_supply: u64,
    pub post_liquidity: u64,
}

/// Typed event yielded by the decoder for one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "data")]
pub enum DomainEvent {
    GameSettled(GameSettledEvent),
    PoolChange(PoolChangeEvent),
}

impl DomainEvent {
    pub fn signature(&self) -> &str {
        match self {
            DomainEvent::GameSettled(e) => &e.signature,
            DomainEvent::PoolChange(e) => &e.signature,
        }
    }

    pub fn block_time(&self) -> i64 {
        match self {
            DomainEvent::GameSettled(e) => e.block_time,
            DomainEvent::PoolChange(e) => e.block_time,
        }
    }

    pub fn token_mint(&self) -> &str {
        match self {
            DomainEvent::GameSettled(e) => &e.token_mint,
            DomainEvent::PoolChange(e) => &e.token_mint,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::GameSettled(_) => "GameSettled",
            DomainEvent::PoolChange(_) => "PoolChange",
        }
    }
}
