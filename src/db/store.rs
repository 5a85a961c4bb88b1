use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;

use super::{game_repo, pool_change_repo, signature_repo};
use crate::models::{PoolChange, SettledGame, SignatureRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub signatures: i64,
    pub settled_games: i64,
    pub pool_changes: i64,
}

/// Persistence contract of the ingestion pipeline. Every write is an
/// upsert keyed by signature.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// `max(latest settled game, latest pool change)` block time, 0 when empty.
    async fn high_water_mark(&self) -> Result<i64, StoreError>;

    /// Signatures at or after `block_time` with no decoded event record,
    /// ascending by block time.
    async fn identifiers_since(&self, block_time: i64) -> Result<Vec<SignatureRecord>, StoreError>;

    /// The newest stored signature.
    async fn latest_identifier(&self) -> Result<Option<SignatureRecord>, StoreError>;

    async fn upsert_identifier(&self, record: &SignatureRecord) -> Result<(), StoreError>;

    async fn upsert_settled_game(&self, game: &SettledGame) -> Result<(), StoreError>;

    async fn upsert_pool_change(&self, change: &PoolChange) -> Result<(), StoreError>;

    async fn counts(&self) -> Result<StoreCounts, StoreError>;
}

/// Postgres-backed [`EventStore`].
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn high_water_mark(&self) -> Result<i64, StoreError> {
        let latest_game = game_repo::get_latest_block_time(&self.pool).await?;
        let latest_pool_change = pool_change_repo::get_latest_block_time(&self.pool).await?;

        Ok(latest_game.unwrap_or(0).max(latest_pool_change.unwrap_or(0)))
    }

    async fn identifiers_since(&self, block_time: i64) -> Result<Vec<SignatureRecord>, StoreError> {
        Ok(signature_repo::get_undecoded_since(&self.pool, block_time).await?)
    }

    async fn latest_identifier(&self) -> Result<Option<SignatureRecord>, StoreError> {
        Ok(signature_repo::get_latest_signature(&self.pool).await?)
    }

    async fn upsert_identifier(&self, record: &SignatureRecord) -> Result<(), StoreError> {
        Ok(signature_repo::upsert_signature(&self.pool, record).await?)
    }

    async fn upsert_settled_game(&self, game: &SettledGame) -> Result<(), StoreError> {
        Ok(game_repo::upsert_settled_game(&self.pool, game).await?)
    }

    async fn upsert_pool_change(&self, change: &PoolChange) -> Result<(), StoreError> {
        Ok(pool_change_repo::upsert_pool_change(&self.pool, change).await?)
    }

    async fn counts(&self) -> Result<StoreCounts, StoreError> {
        Ok(StoreCounts {
            signatures: signature_repo::count_signatures(&self.pool).await?,
            settled_games: game_repo::count_settled_games(&self.pool).await?,
            pool_changes: pool_change_repo::count_pool_changes(&self.pool).await?,
        })
    }
}
