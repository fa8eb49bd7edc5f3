//! Request/response bodies for the REST surface. Wire-facing shapes only —
//! domain logic lives in `job.rs` and `orchestrator.rs`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::job::{ErrorType, Job, ProcessingOptions, ProcessingResult};

#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    pub file_path: String,
    pub options: Option<ProcessingOptions>,
}

#[derive(Debug, Deserialize)]
pub struct BatchProcessRequest {
    pub file_paths: Vec<String>,
    pub options: Option<ProcessingOptions>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub processing_tier: String,
    pub queue_size: usize,
    pub active_jobs: usize,
    pub trace_id: String,
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub job_id: Uuid,
    pub status: &'static str,
    pub message: &'static str,
    pub trace_id: String,
}

#[derive(Debug, Serialize)]
pub struct BatchProcessResponse {
    pub job_ids: Vec<Uuid>,
    pub status: &'static str,
    pub total_documents: usize,
    pub correlation_id: String,
    pub trace_id: String,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub status: &'static str,
    pub job_id: Uuid,
    pub trace_id: String,
}

#[derive(Debug, Serialize)]
pub struct JobStatus {
    pub job_id: Uuid,
    pub file_path: String,
    pub status: String,
    pub progress: u8,
    pub result: Option<ProcessingResult>,
    pub error: Option<String>,
    pub error_type: Option<ErrorType>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub trace_id: String,
    pub correlation_id: Option<String>,
    pub memory_rss_start_mb: Option<f64>,
    pub memory_rss_end_mb: Option<f64>,
}

impl From<Job> for JobStatus {
    fn from(job: Job) -> Self {
        JobStatus {
            job_id: job.id,
            file_path: job.file_path,
            status: match job.state {
                crate::job::JobState::Queued => "queued",
                crate::job::JobState::Processing => "processing",
                crate::job::JobState::Completed => "completed",
                crate::job::JobState::Failed => "failed",
                crate::job::JobState::Cancelled => "cancelled",
            }
            .to_string(),
            progress: job.progress,
            result: job.result,
            error: job.error,
            error_type: job.error_type,
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            trace_id: job.trace_id,
            correlation_id: job.correlation_id,
            memory_rss_start_mb: job.memory_rss_start_mb,
            memory_rss_end_mb: job.memory_rss_end_mb,
        }
    }
}
