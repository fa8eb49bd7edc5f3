//! Per-job scratch directories and the startup orphan sweep.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use serde::Serialize;
use uuid::Uuid;

use crate::config::Settings;

pub const ORPHAN_AGE: Duration = Duration::from_secs(3600);

pub fn job_temp_dir(settings: &Settings, job_id: Uuid) -> PathBuf {
    settings.temp_dir().join(format!("job_{job_id}"))
}

pub async fn ensure_job_temp_dir(settings: &Settings, job_id: Uuid) -> std::io::Result<PathBuf> {
    let dir = job_temp_dir(settings, job_id);
    tokio::fs::create_dir_all(&dir).await?;
    Ok(dir)
}

#[derive(Debug, Serialize)]
pub struct TempDirStats {
    pub path: String,
    pub exists: bool,
    pub size_bytes: u64,
    pub job_count: u64,
}

/// Scan `temp_dir` for `job_<uuid>` directories older than `max_age` and
/// delete them. Never aborts the caller: failures on individual entries
/// are logged and skipped.
pub async fn sweep_orphans(settings: &Settings, max_age: Duration) -> u64 {
    let temp_dir = settings.temp_dir();
    tracing::info!(temp_dir = %temp_dir.display(), max_age_seconds = max_age.as_secs(), "orphan_cleanup_starting");

    if tokio::fs::create_dir_all(&temp_dir).await.is_err() {
        tracing::warn!(path = %temp_dir.display(), "temp_dir_not_found");
        return 0;
    }

    let mut cleaned = 0u64;
    let mut entries = match tokio::fs::read_dir(&temp_dir).await {
        Ok(e) => e,
        Err(error) => {
            tracing::error!(%error, temp_dir = %temp_dir.display(), "orphan_cleanup_failed");
            return 0;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(e)) => e,
            Ok(None) => break,
            Err(error) => {
                tracing::error!(%error, "orphan_cleanup_failed");
                break;
            }
        };

        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with("job_") {
            continue;
        }

        let meta = match entry.metadata().await {
            Ok(m) if m.is_dir() => m,
            _ => continue,
        };

        let age = meta
            .modified()
            .ok()
            .and_then(|m| SystemTime::now().duration_since(m).ok())
            .unwrap_or_default();

        if age > max_age {
            tracing::info!(path = %path.display(), age_seconds = age.as_secs(), "orphan_temp_dir_found");
            match tokio::fs::remove_dir_all(&path).await {
                Ok(()) => {
                    cleaned += 1;
                    tracing::info!(path = %path.display(), "orphan_temp_dir_cleaned");
                }
                Err(error) => {
                    tracing::error!(%error, path = %path.display(), "orphan_cleanup_item_failed");
                }
            }
        }
    }

    tracing::info!(cleaned_count = cleaned, "orphan_cleanup_completed");
    cleaned
}

pub async fn stats(settings: &Settings) -> TempDirStats {
    let temp_dir = settings.temp_dir();
    let mut stats = TempDirStats {
        path: temp_dir.display().to_string(),
        exists: temp_dir.exists(),
        size_bytes: 0,
        job_count: 0,
    };
    if !stats.exists {
        return stats;
    }

    let mut stack = vec![temp_dir.clone()];
    while let Some(dir) = stack.pop() {
        let Ok(mut entries) = tokio::fs::read_dir(&dir).await else { continue };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let Ok(meta) = entry.metadata().await else { continue };
            if meta.is_dir() {
                if dir == temp_dir
                    && entry.file_name().to_string_lossy().starts_with("job_")
                {
                    stats.job_count += 1;
                }
                stack.push(entry.path());
            } else {
                stats.size_bytes += meta.len();
            }
        }
    }
    stats
}
