use axum::extract::State;
use axum::Json;
use chrono::DateTime;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::ingestion::SyncSummary;
use crate::AppState;

/// POST /sync: run a sync now and return its summary.
pub async fn trigger(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let Ok(_guard) = state.sync_lock.try_lock() else {
        return Err(AppError::Conflict("a sync run is already in progress".into()));
    };

    tracing::info!("Manual sync triggered via API");
    let summary: SyncSummary = state.orchestrator.run_sync().await?;

    Ok(Json(json!({ "success": true, "data": summary })))
}

/// GET /sync/status: what the store currently holds.
pub async fn status(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let store = state.orchestrator.store();

    let high_water_mark = store.high_water_mark().await?;
    let latest = store.latest_identifier().await?;
    let counts = store.counts().await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "high_water_mark": high_water_mark,
            "high_water_mark_at": DateTime::from_timestamp(high_water_mark, 0).map(|t| t.to_rfc3339()),
            "latest_signature": latest,
            "syncing": state.orchestrator.is_running(),
            "counts": counts,
        }
    })))
}
