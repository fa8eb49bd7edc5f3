//! The worker loop: dequeue, claim, convert under a deadline, write back.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::Settings;
use crate::engine::{ConvertError, Converter};
use crate::job::{ErrorType, Job, JobState};
use crate::tempdir;

const DEQUEUE_POLL: Duration = Duration::from_secs(1);

pub async fn run(
    worker_id: usize,
    registry: Arc<RwLock<HashMap<Uuid, Job>>>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<Uuid>>>,
    queue_size: Arc<AtomicUsize>,
    shutdown: CancellationToken,
    settings: Arc<Settings>,
    engine: Arc<dyn Converter>,
) {
    tracing::info!(worker_id, "worker_started");

    while !shutdown.is_cancelled() {
        let next = {
            let mut guard = rx.lock().await;
            tokio::time::timeout(DEQUEUE_POLL, guard.recv()).await
        };

        let job_id = match next {
            Ok(Some(id)) => id,
            Ok(None) => break, // sender dropped, channel drained
            Err(_) => continue, // idle poll elapsed, re-check shutdown token
        };
        queue_size.fetch_sub(1, Ordering::SeqCst);

        // Tombstone check: the job may have been cancelled while queued.
        let claimed = {
            let mut reg = registry.write().await;
            match reg.get_mut(&job_id) {
                Some(job) if job.state == JobState::Queued => {
                    job.state = JobState::Processing;
                    job.started_at = Some(chrono::Utc::now());
                    job.progress = 10;
                    job.memory_rss_start_mb = sample_rss_mb();
                    Some(job.clone())
                }
                _ => None,
            }
        };

        let Some(mut snapshot) = claimed else { continue };

        tracing::info!(
            worker_id,
            job_id = %job_id,
            trace_id = %snapshot.trace_id,
            memory_mb = snapshot.memory_rss_start_mb,
            "job_processing_started"
        );

        // Scratch dir for this job, created on claim like the source's
        // get_job_temp_dir mkdir-on-access. A failure here is logged and
        // skipped, not fatal to the job — the engine stand-in never writes
        // into it, but a real OCR/table backend would.
        if let Err(error) = tempdir::ensure_job_temp_dir(&settings, job_id).await {
            tracing::warn!(job_id = %job_id, %error, "job_temp_dir_create_failed");
        }

        process_job(&mut snapshot, &settings, &engine).await;

        {
            let mut reg = registry.write().await;
            if let Some(job) = reg.get_mut(&job_id) {
                *job = snapshot;
            }
        }
    }

    tracing::info!(worker_id, "worker_stopped");
}

async fn process_job(job: &mut Job, settings: &Settings, engine: &Arc<dyn Converter>) {
    let tier_str = job
        .options
        .processing_tier
        .map(|t| t.to_string())
        .unwrap_or_else(|| settings.processing_tier.to_string());

    let timeout_seconds = job
        .options
        .timeout_seconds
        .unwrap_or_else(|| settings.calc_timeout(100, Some(&tier_str)));

    job.progress = 20;

    let engine = engine.clone();
    let file_path = job.file_path.clone();
    let options = job.options.clone();
    let tier_for_task = tier_str.clone();

    // Run the conversion on its own task so a panicking engine can't take
    // the whole worker loop down with it — we observe it as a JoinError.
    // Keeping the abort handle lets a timed-out conversion be cancelled
    // instead of leaking a task that runs forever in the background.
    let conversion = tokio::spawn(async move {
        engine.convert(&file_path, &options, &tier_for_task).await
    });
    let abort_handle = conversion.abort_handle();

    let outcome = tokio::time::timeout(Duration::from_secs(timeout_seconds), conversion).await;
    if outcome.is_err() {
        abort_handle.abort();
    }

    match outcome {
        Ok(Ok(Ok(result))) => {
            job.progress = 90;
            job.state = JobState::Completed;
            tracing::info!(
                job_id = %job.id,
                page_count = result.metadata.page_count,
                processing_time_ms = result.metadata.processing_time_ms,
                "job_completed"
            );
            job.result = Some(result);
        }
        Ok(Ok(Err(err))) => {
            job.state = JobState::Failed;
            job.error_type = Some(ErrorType::ProcessingError);
            job.error = Some(format_convert_error(&err));
            tracing::error!(
                job_id = %job.id,
                error = %job.error.as_deref().unwrap_or_default(),
                "job_failed"
            );
        }
        Ok(Err(join_error)) => {
            job.state = JobState::Failed;
            job.error_type = Some(ErrorType::ProcessingError);
            job.error = Some(format!("engine task failed: {join_error}"));
            tracing::error!(job_id = %job.id, %join_error, "job_failed");
        }
        Err(_elapsed) => {
            job.state = JobState::Failed;
            job.error_type = Some(ErrorType::Timeout);
            job.error = Some(format!("Processing timeout after {timeout_seconds} seconds"));
            tracing::error!(job_id = %job.id, timeout_seconds, "job_timeout");
        }
    }

    job.completed_at.get_or_insert_with(chrono::Utc::now);
    job.progress = 100;
    job.memory_rss_end_mb = sample_rss_mb();

    // Mirrors the source's `memory_end_mb - (memory_start_mb or 0)` — a
    // missing start sample (no /proc on this platform) is treated as 0
    // rather than poisoning the delta with a null.
    let memory_delta_mb = job
        .memory_rss_end_mb
        .map(|end| end - job.memory_rss_start_mb.unwrap_or(0.0));

    tracing::info!(
        job_id = %job.id,
        state = ?job.state,
        memory_start_mb = job.memory_rss_start_mb,
        memory_end_mb = job.memory_rss_end_mb,
        memory_delta_mb,
        "job_finished"
    );
}

fn format_convert_error(err: &ConvertError) -> String {
    match err {
        ConvertError::NotFound(path) => format!("File not found: {path}"),
        ConvertError::PermissionDenied(path) => format!("Permission denied: {path}"),
        ConvertError::Other(msg) => msg.clone(),
    }
}

/// Resident set size of this process in megabytes, read from `/proc/self/statm`.
/// `None` on platforms without a `/proc` filesystem.
#[cfg(target_os = "linux")]
fn sample_rss_mb() -> Option<f64> {
    let contents = std::fs::read_to_string("/proc/self/statm").ok()?;
    let rss_pages: u64 = contents.split_whitespace().nth(1)?.parse().ok()?;
    let page_size = 4096u64;
    Some((rss_pages * page_size) as f64 / (1024.0 * 1024.0))
}

#[cfg(not(target_os = "linux"))]
fn sample_rss_mb() -> Option<f64> {
    None
}
