use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;

use docproc_service::config::Settings;
use docproc_service::engine::StubConverter;
use docproc_service::orchestrator::Orchestrator;
use docproc_service::{http, logging, tempdir};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Arc::new(Settings::parse());
    logging::init(settings.log_level);

    tracing::info!(
        host = %settings.host,
        port = settings.port,
        processing_tier = %settings.processing_tier,
        max_concurrent_jobs = settings.max_concurrent_jobs,
        "service_starting"
    );

    tempdir::sweep_orphans(&settings, tempdir::ORPHAN_AGE).await;

    let orchestrator = Arc::new(Orchestrator::new(settings.clone(), Arc::new(StubConverter)));
    orchestrator.start().await;
    tracing::info!("service_started");

    let app = http::router(http::AppState {
        orchestrator: orchestrator.clone(),
    });

    let addr = format!("{}:{}", settings.host, settings.port);
    let listener = TcpListener::bind(&addr).await?;

    // Single readiness line on stdout for a supervising parent process;
    // every other diagnostic goes to stderr via `logging::init`.
    println!("DOCLING_READY|{}|{}", settings.host, settings.port);
    use std::io::Write;
    std::io::stdout().flush().ok();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("service_stopping");
    orchestrator.stop().await;
    tracing::info!("service_stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown_signal_received");
}
