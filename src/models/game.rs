use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::fairness::compute_outcome;
use crate::models::GameSettledEvent;

/// Database row for the settled_games table.
///
/// Token amounts are kept as decimal strings so u64 values survive
/// without rounding; only the USD price is numeric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SettledGame {
    pub signature: String,
    pub block_time: i64,
    pub metadata: String,
    pub nonce: String,
    pub client_seed: String,
    pub rng_seed: String,
    pub next_rng_seed_hashed: String,
    /// JSON array of the bet weights.
    pub bet: String,
    pub bet_length: i32,
    pub result_number: i32,
    pub creator: String,
    pub user_address: String,
    pub token: String,
    pub pool: String,
    pub wager: String,
    pub payout: String,
    pub multiplier_bps: String,
    pub creator_fee: String,
    pub pool_fee: String,
    pub whisky_fee: String,
    pub jackpot_fee: String,
    pub jackpot: String,
    pub pool_liquidity: String,
    pub usd_per_unit: Decimal,
}

impl SettledGame {
    /// Build the stored row from a decoded event, recomputing the outcome
    /// number from the revealed seeds.
    pub fn from_event(event: &GameSettledEvent, usd_per_unit: Decimal) -> Self {
        let result_number = compute_outcome(&event.rng_seed, &event.client_seed, event.nonce);

        Self {
            signature: event.signature.clone(),
            block_time: event.block_time,
            metadata: event.metadata.clone(),
            nonce: event.nonce.to_string(),
            client_seed: event.client_seed.clone(),
            rng_seed: event.rng_seed.clone(),
            next_rng_seed_hashed: event.next_rng_seed_hashed.clone(),
            bet: serde_json::json!(event.bet).to_string(),
            bet_length: i32::try_from(event.bet.len()).unwrap_or(i32::MAX),
            // Outcomes are < 2^20, always fits.
            result_number: result_number as i32,
            creator: event.creator.clone(),
            user_address: event.user.clone(),
            token: event.token_mint.clone(),
            pool: event.pool.clone(),
            wager: event.wager.to_string(),
            payout: event.payout.to_string(),
            multiplier_bps: event.multiplier_bps.to_string(),
            creator_fee: event.creator_fee.to_string(),
            pool_fee: event.pool_fee.to_string(),
            whisky_fee: event.whisky_fee.to_string(),
            jackpot_fee: event.jackpot_fee.to_string(),
            jackpot: event.jackpot_payout_to_user.to_string(),
            pool_liquidity: event.pool_liquidity.to_string(),
            usd_per_unit,
        }
    }
}
