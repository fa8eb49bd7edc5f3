use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use uuid::Uuid;

use crate::error::AppError;
use crate::http::dto::{
    BatchProcessRequest, BatchProcessResponse, CancelResponse, HealthResponse, JobStatus,
    ProcessRequest, ProcessResponse,
};
use crate::http::trace::TraceId;
use crate::http::AppState;
use crate::orchestrator::CancelOutcome;

pub async fn health(
    State(state): State<AppState>,
    Extension(trace_id): Extension<TraceId>,
) -> Json<HealthResponse> {
    let orch = &state.orchestrator;
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        processing_tier: orch.settings.processing_tier.to_string(),
        queue_size: orch.size(),
        active_jobs: orch.active_count().await,
        trace_id: trace_id.0,
    })
}

pub async fn process(
    State(state): State<AppState>,
    Extension(trace_id): Extension<TraceId>,
    Json(request): Json<ProcessRequest>,
) -> Json<ProcessResponse> {
    let job = state
        .orchestrator
        .enqueue(
            request.file_path,
            request.options.unwrap_or_default(),
            Some(trace_id.0.clone()),
            None,
        )
        .await;

    Json(ProcessResponse {
        job_id: job.id,
        status: "queued",
        message: "Document queued for processing",
        trace_id: trace_id.0,
    })
}

pub async fn process_batch(
    State(state): State<AppState>,
    Extension(trace_id): Extension<TraceId>,
    Json(request): Json<BatchProcessRequest>,
) -> Json<BatchProcessResponse> {
    let total = request.file_paths.len();
    let (correlation_id, job_ids) = state
        .orchestrator
        .enqueue_batch(
            request.file_paths,
            request.options.unwrap_or_default(),
            Some(trace_id.0.clone()),
        )
        .await;

    Json(BatchProcessResponse {
        job_ids,
        status: "queued",
        total_documents: total,
        correlation_id,
        trace_id: trace_id.0,
    })
}

pub async fn get_job(
    State(state): State<AppState>,
    Extension(trace_id): Extension<TraceId>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobStatus>, AppError> {
    let job = state
        .orchestrator
        .get(job_id)
        .await
        .ok_or_else(|| AppError::job_not_found(job_id, trace_id.0.clone()))?;
    Ok(Json(job.into()))
}

pub async fn list_jobs(State(state): State<AppState>) -> Json<Vec<JobStatus>> {
    let jobs = state.orchestrator.list().await;
    Json(jobs.into_iter().map(JobStatus::from).collect())
}

pub async fn cancel_job(
    State(state): State<AppState>,
    Extension(trace_id): Extension<TraceId>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<CancelResponse>, AppError> {
    match state.orchestrator.cancel(job_id).await {
        CancelOutcome::Cancelled => Ok(Json(CancelResponse {
            status: "cancelled",
            job_id,
            trace_id: trace_id.0,
        })),
        CancelOutcome::NotFound => Err(AppError::job_not_found(job_id, trace_id.0.clone())),
        CancelOutcome::NotCancellable => Err(AppError::not_cancellable(job_id, trace_id.0.clone())),
    }
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "not found")
}
