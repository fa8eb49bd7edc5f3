//! Structured JSON logging to stderr, configured once at process start.
//! stdout is reserved for the single readiness line (see `main.rs`).

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LogLevel;

pub fn init(level: LogLevel) {
    let filter = EnvFilter::try_new(level.as_filter_str()).unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .json()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}
