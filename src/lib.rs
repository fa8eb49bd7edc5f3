pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod job;
pub mod logging;
pub mod orchestrator;
pub mod tempdir;
pub mod worker;
