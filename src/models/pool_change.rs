use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::PoolChangeEvent;

/// Database row for the pool_changes table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PoolChange {
    pub signature: String,
    pub block_time: i64,
    pub action: String,
    pub token: String,
    pub pool: String,
    pub user_address: String,
    pub amount: String,
    pub lp_supply: String,
    pub post_liquidity: String,
    pub usd_per_unit: Decimal,
}

impl PoolChange {
    pub fn from_event(event: &PoolChangeEvent, usd_per_unit: Decimal) -> Self {
        Self {
            signature: event.signature.clone(),
            block_time: event.block_time,
            action: event.action.as_str().to_string(),
            token: event.token_mint.clone(),
            pool: event.pool.clone(),
            user_address: event.user.clone(),
            amount: event.amount.to_string(),
            lp_supply: event.lp_supply.to_string(),
            post_liquidity: event.post_liquidity.to_string(),
            usd_per_unit,
        }
    }
}
