//! Crate-level error type for orchestrator/HTTP-boundary failures.
//!
//! Job processing failures (`error_type`, `error`) live on the `Job`
//! record itself (see `job.rs`) and never surface as a Rust `Err` — only
//! genuine request/orchestrator-invariant failures go through here.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("job not found: {id}")]
    JobNotFound { id: uuid::Uuid, trace_id: String },

    #[error("job {id} cannot be cancelled in its current state")]
    NotCancellable { id: uuid::Uuid, trace_id: String },

    #[error("unauthorized")]
    Unauthorized { trace_id: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn job_not_found(id: uuid::Uuid, trace_id: impl Into<String>) -> Self {
        AppError::JobNotFound { id, trace_id: trace_id.into() }
    }

    pub fn not_cancellable(id: uuid::Uuid, trace_id: impl Into<String>) -> Self {
        AppError::NotCancellable { id, trace_id: trace_id.into() }
    }

    pub fn unauthorized(trace_id: impl Into<String>) -> Self {
        AppError::Unauthorized { trace_id: trace_id.into() }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
    trace_id: Option<String>,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::JobNotFound { .. } => StatusCode::NOT_FOUND,
            AppError::NotCancellable { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn trace_id(&self) -> Option<String> {
        match self {
            AppError::JobNotFound { trace_id, .. }
            | AppError::NotCancellable { trace_id, .. }
            | AppError::Unauthorized { trace_id, .. } => Some(trace_id.clone()),
            AppError::Internal(_) => None,
        }
    }
}

/// Implemented so handlers can just return `Result<impl IntoResponse, AppError>`
/// — this is the single translation point from Rust errors to the
/// `{detail, trace_id}` wire contract.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(self, AppError::Internal(_)) {
            tracing::error!(error = %self, "unhandled_exception");
        }
        let status = self.status();
        let trace_id = self.trace_id();
        let mut response = (
            status,
            Json(ErrorBody {
                detail: self.to_string(),
                trace_id,
            }),
        )
            .into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert("WWW-Authenticate", "Bearer".parse().unwrap());
        }
        response
    }
}
