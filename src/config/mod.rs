use std::env;
use std::num::NonZeroUsize;
use std::time::Duration;

use crate::ingestion::{RetryPolicy, SyncConfig};
use crate::solana::Commitment;

const DEFAULT_HELIUS_API_URL: &str = "https://mainnet.helius-rpc.com";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,

    /// Shared key for the manual sync trigger.
    pub api_key: String,

    // Ledger
    pub solana_rpc_endpoint: String,
    pub program_id: String,
    pub commitment: Commitment,

    // Prices
    pub helius_api_key: String,
    pub helius_api_url: String,

    // Sync
    pub sync_interval_secs: u64,
    pub signature_page_size: usize,
    pub transaction_batch_size: NonZeroUsize,
    pub page_delay_ms: u64,
    pub retry_base_delay_ms: u64,
    /// 0 retries forever.
    pub retry_max_attempts: u32,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".into())
                .parse()?,

            api_key: required("API_KEY")?,

            solana_rpc_endpoint: required("SOLANA_RPC_ENDPOINT")?,
            program_id: required("PROGRAM_ID")?,
            commitment: parse_or("COMMITMENT", Commitment::Confirmed)?,

            helius_api_key: required("HELIUS_API_KEY")?,
            helius_api_url: env::var("HELIUS_API_URL")
                .unwrap_or_else(|_| DEFAULT_HELIUS_API_URL.into()),

            sync_interval_secs: parse_or("SYNC_INTERVAL_SECS", 60)?,
            signature_page_size: parse_or("SIGNATURE_PAGE_SIZE", 1000)?,
            transaction_batch_size: parse_or(
                "TRANSACTION_BATCH_SIZE",
                NonZeroUsize::new(100).unwrap_or(NonZeroUsize::MIN),
            )?,
            page_delay_ms: parse_or("PAGE_DELAY_MS", 100)?,
            retry_base_delay_ms: parse_or("RETRY_BASE_DELAY_MS", 1000)?,
            retry_max_attempts: parse_or("RETRY_MAX_ATTEMPTS", 8)?,
        })
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            page_size: self.signature_page_size,
            batch_size: self.transaction_batch_size,
            page_delay: Duration::from_millis(self.page_delay_ms),
            retry: RetryPolicy {
                base_delay: Duration::from_millis(self.retry_base_delay_ms),
                max_attempts: (self.retry_max_attempts > 0).then_some(self.retry_max_attempts),
            },
            commitment: self.commitment,
        }
    }
}

fn required(name: &str) -> anyhow::Result<String> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("{name} must be set"))
}

fn parse_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {name}={raw:?}: {e}")),
        Err(_) => Ok(default),
    }
}
