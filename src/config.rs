//! Process-wide configuration, built once at startup from CLI args with
//! environment-variable fallbacks (`clap`'s `env` attribute does the
//! fallback resolution; nothing here reads `std::env` directly).

use std::fmt;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingTier {
    Lightweight,
    Standard,
    Advanced,
}

impl ProcessingTier {
    /// Timeout multiplier per the `calc_timeout` formula. Unknown tiers
    /// (only reachable via the raw-string path used for options parsed
    /// off the wire) fold to 1.0 — see `multiplier_for_str`.
    pub fn multiplier(self) -> f64 {
        match self {
            ProcessingTier::Lightweight => 0.5,
            ProcessingTier::Standard => 1.0,
            ProcessingTier::Advanced => 2.0,
        }
    }

    pub fn multiplier_for_str(s: &str) -> f64 {
        match s {
            "lightweight" => 0.5,
            "standard" => 1.0,
            "advanced" => 2.0,
            _ => 1.0,
        }
    }
}

impl fmt::Display for ProcessingTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessingTier::Lightweight => "lightweight",
            ProcessingTier::Standard => "standard",
            ProcessingTier::Advanced => "advanced",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Document processing orchestration service.
#[derive(Debug, Parser, Clone)]
#[command(name = "docproc-service", version)]
pub struct Settings {
    /// Host to bind the server
    #[arg(long, env = "DOCLING_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "DOCLING_PORT", default_value_t = 8765)]
    pub port: u16,

    /// Shared secret for Bearer authentication. Empty disables auth.
    #[arg(long, env = "DOCLING_AUTH_TOKEN", default_value = "")]
    pub auth_token: String,

    /// Default processing tier used when a job does not specify one
    #[arg(long, env = "DOCLING_PROCESSING_TIER", default_value = "standard")]
    pub processing_tier: ProcessingTier,

    /// Temporary directory for per-job scratch files. Defaults to
    /// `<system temp>/docling` when unset.
    #[arg(long = "temp-folder", env = "DOCLING_TEMP_DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Maximum number of concurrent processing jobs (1-3)
    #[arg(long = "max-concurrent", env = "DOCLING_MAX_CONCURRENT_JOBS", default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=3))]
    pub max_concurrent_jobs: u8,

    /// Logging level
    #[arg(long, env = "DOCLING_LOG_LEVEL", default_value = "info", ignore_case = true)]
    pub log_level: LogLevel,

    /// Base timeout in seconds for the timeout formula
    #[arg(long, env = "DOCLING_TIMEOUT_BASE_SECONDS", default_value_t = 60)]
    pub timeout_base_seconds: u64,

    /// Additional timeout per estimated page for the timeout formula
    #[arg(long, env = "DOCLING_TIMEOUT_PER_PAGE_SECONDS", default_value_t = 10)]
    pub timeout_per_page_seconds: u64,
}

impl Settings {
    /// `--temp-folder`/`DOCLING_TEMP_DIR` takes priority; `DOCLING_TEMP_FOLDER`
    /// is accepted as a secondary env alias (clap's `env` attribute only
    /// binds one name per field), falling back to `<system temp>/docling`.
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir
            .clone()
            .or_else(|| std::env::var_os("DOCLING_TEMP_FOLDER").map(PathBuf::from))
            .unwrap_or_else(|| std::env::temp_dir().join("docling"))
    }

    /// `calc_timeout(page_count, tier)` from the design notes: rounds
    /// `(base + per_page * page_count) * tier_multiplier` to whole seconds.
    pub fn calc_timeout(&self, page_count: u64, tier: Option<&str>) -> u64 {
        let multiplier = match tier {
            Some(t) => ProcessingTier::multiplier_for_str(t),
            None => self.processing_tier.multiplier(),
        };
        let base = (self.timeout_base_seconds + page_count * self.timeout_per_page_seconds) as f64;
        (base * multiplier).round() as u64
    }
}
