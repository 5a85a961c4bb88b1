use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::errors::AppError;
use crate::AppState;

/// API-key authentication middleware.
///
/// Accepts the configured key either as `x-api-key: <key>` or as
/// `Authorization: Bearer <key>`.
pub async fn require_api_key(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let headers = req.headers();

    let provided = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
        });

    match provided {
        Some(key) if !key.is_empty() && key == state.config.api_key => next.run(req).await,
        _ => AppError::Unauthorized.into_response(),
    }
}
