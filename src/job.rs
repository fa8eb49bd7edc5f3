//! Job record and the five-state lifecycle it moves through.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ProcessingTier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed | JobState::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    Timeout,
    ProcessingError,
}

/// Per-job overrides. Everything is optional; absent fields fall back to
/// process-wide defaults (see `Settings`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingOptions {
    pub processing_tier: Option<ProcessingTier>,
    pub languages: Option<Vec<String>>,
    #[serde(default)]
    pub force_full_page_ocr: bool,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingMetadata {
    pub page_count: u64,
    pub processing_tier: String,
    pub format: String,
    pub processing_time_ms: u64,
    pub ocr_engine: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub markdown: String,
    pub metadata: ProcessingMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: Uuid,
    pub file_path: String,
    #[serde(skip)]
    pub options: ProcessingOptions,
    pub state: JobState,
    pub progress: u8,
    pub result: Option<ProcessingResult>,
    pub error: Option<String>,
    pub error_type: Option<ErrorType>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub trace_id: String,
    pub correlation_id: Option<String>,
    #[serde(skip)]
    pub memory_rss_start_mb: Option<f64>,
    #[serde(skip)]
    pub memory_rss_end_mb: Option<f64>,
}

impl Job {
    pub fn new(
        file_path: String,
        options: ProcessingOptions,
        trace_id: String,
        correlation_id: Option<String>,
    ) -> Self {
        Job {
            id: Uuid::new_v4(),
            file_path,
            options,
            state: JobState::Queued,
            progress: 0,
            result: None,
            error: None,
            error_type: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            trace_id,
            correlation_id,
            memory_rss_start_mb: None,
            memory_rss_end_mb: None,
        }
    }
}
