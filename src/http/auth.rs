//! Bearer-token guard applied to every protected route. Disabled entirely
//! when the configured token is empty.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::AppError;
use crate::http::trace::TraceId;
use crate::http::AppState;

pub async fn require_bearer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if state.orchestrator.settings.auth_token.is_empty() {
        return Ok(next.run(req).await);
    }

    let trace_id = req
        .extensions()
        .get::<TraceId>()
        .map(|t| t.0.clone())
        .unwrap_or_default();

    let provided = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match provided {
        Some(token) if token == state.orchestrator.settings.auth_token => Ok(next.run(req).await),
        _ => {
            tracing::warn!("auth_invalid_or_missing_credentials");
            Err(AppError::unauthorized(trace_id))
        }
    }
}
