pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod fairness;
pub mod ingestion;
pub mod metrics;
pub mod models;
pub mod pricing;
pub mod solana;

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::AppConfig;
use crate::ingestion::SyncOrchestrator;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: AppConfig,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
    pub orchestrator: Arc<SyncOrchestrator>,
    /// Held for the duration of a sync run; runs never overlap in-process.
    pub sync_lock: Arc<Mutex<()>>,
}
