pub mod helius;

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use thiserror::Error;

pub use helius::HeliusPriceClient;

#[derive(Debug, Error)]
pub enum PriceError {
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("price service error: {0}")]
    Service(String),

    #[error("no USD price for token {0}")]
    Missing(String),
}

/// USD value of one raw unit of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPrice {
    pub usd_per_unit: Decimal,
}

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Current price for every requested token. Fails with
    /// [`PriceError::Missing`] if any of them cannot be priced.
    async fn get_prices(
        &self,
        token_ids: &[String],
    ) -> Result<HashMap<String, TokenPrice>, PriceError>;
}
