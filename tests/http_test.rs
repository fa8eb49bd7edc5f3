use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use docproc_service::config::{LogLevel, ProcessingTier, Settings};
use docproc_service::engine::{ConvertError, Converter};
use docproc_service::http::{router, AppState};
use docproc_service::job::{ProcessingMetadata, ProcessingOptions, ProcessingResult};
use docproc_service::orchestrator::Orchestrator;

fn settings(auth_token: &str) -> Arc<Settings> {
    settings_with_concurrency(auth_token, 2)
}

fn settings_with_concurrency(auth_token: &str, max_concurrent_jobs: u8) -> Arc<Settings> {
    Arc::new(Settings {
        host: "127.0.0.1".into(),
        port: 0,
        auth_token: auth_token.into(),
        processing_tier: ProcessingTier::Standard,
        temp_dir: None,
        max_concurrent_jobs,
        log_level: LogLevel::Error,
        timeout_base_seconds: 60,
        timeout_per_page_seconds: 10,
    })
}

/// A scriptable engine: files whose name contains "fail" error out, files
/// containing "hang" never return (exercised with `tokio::time::pause`),
/// files containing "panic" panic outright, everything else succeeds
/// immediately.
struct ScriptedConverter;

#[async_trait::async_trait]
impl Converter for ScriptedConverter {
    async fn convert(
        &self,
        file_path: &str,
        _options: &ProcessingOptions,
        tier: &str,
    ) -> Result<ProcessingResult, ConvertError> {
        if file_path.contains("hang") {
            std::future::pending::<()>().await;
            unreachable!()
        }
        if file_path.contains("panic") {
            panic!("synthetic engine panic");
        }
        if file_path.contains("fail") {
            return Err(ConvertError::Other("synthetic failure".into()));
        }
        Ok(ProcessingResult {
            markdown: format!("# {file_path}"),
            metadata: ProcessingMetadata {
                page_count: 1,
                processing_tier: tier.to_string(),
                format: "pdf".into(),
                processing_time_ms: 1,
                ocr_engine: "stub".into(),
            },
        })
    }
}

async fn build_app(auth_token: &str) -> (axum::Router, Arc<Orchestrator>) {
    let orchestrator = Arc::new(Orchestrator::new(settings(auth_token), Arc::new(ScriptedConverter)));
    orchestrator.start().await;
    let app = router(AppState {
        orchestrator: orchestrator.clone(),
    });
    (app, orchestrator)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_requires_no_auth_and_echoes_trace_id() {
    let (app, _orch) = build_app("").await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .header("X-Trace-Id", "550e8400-e29b-41d4-a716-446655440000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-trace-id").unwrap(),
        "550e8400-e29b-41d4-a716-446655440000"
    );
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["trace_id"], "550e8400-e29b-41d4-a716-446655440000");
}

#[tokio::test]
async fn process_without_auth_token_is_rejected_when_configured() {
    let (app, _orch) = build_app("secret").await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/process")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"file_path":"/tmp/a.pdf"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers().get("www-authenticate").unwrap(), "Bearer");
}

#[tokio::test]
async fn happy_path_single_document_completes() {
    let (app, orch) = build_app("").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/process")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"file_path":"/tmp/a.pdf"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let job_id = body["job_id"].as_str().unwrap().to_string();

    // Give the worker a moment to pick it up and finish (instantaneous stub).
    for _ in 0..50 {
        let job = orch.get(job_id.parse().unwrap()).await.unwrap();
        if job.state == docproc_service::job::JobState::Completed {
            assert_eq!(job.progress, 100);
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("job never completed");
}

#[tokio::test]
async fn batch_with_one_failing_document_has_mixed_terminal_states() {
    let (app, orch) = build_app("").await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/process/batch")
                .header("content-type", "application/json")
                .body(Body::from(
                    r#"{"file_paths":["/tmp/a.pdf","/tmp/fail.pdf","/tmp/c.pdf"]}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let job_ids: Vec<String> = body["job_ids"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    assert_eq!(job_ids.len(), 3);
    let correlation_id = body["correlation_id"].as_str().unwrap().to_string();

    let mut states = Vec::new();
    for id in &job_ids {
        let id = id.parse().unwrap();
        for _ in 0..50 {
            let job = orch.get(id).await.unwrap();
            if job.state.is_terminal() {
                states.push(job.state);
                assert_eq!(job.correlation_id.as_deref(), Some(correlation_id.as_str()));
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
    assert_eq!(states.len(), 3);
    let failed = states
        .iter()
        .filter(|s| **s == docproc_service::job::JobState::Failed)
        .count();
    assert_eq!(failed, 1);
}

#[tokio::test]
async fn empty_batch_returns_empty_job_ids() {
    let (app, _orch) = build_app("").await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/process/batch")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"file_paths":[]}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total_documents"], 0);
    assert!(body["job_ids"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_job_returns_404() {
    let (app, _orch) = build_app("").await;

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/jobs/{}", uuid::Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancel_running_job_is_rejected() {
    let (app, orch) = build_app("").await;
    let job = orch
        .enqueue("/tmp/hang.pdf".into(), ProcessingOptions::default(), None, None)
        .await;

    // Wait for the worker to claim it.
    for _ in 0..50 {
        let j = orch.get(job.id).await.unwrap();
        if j.state == docproc_service::job::JobState::Processing {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/v1/jobs/{}", job.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cancel_queued_job_is_skipped_by_worker_without_invoking_engine() {
    // One worker, one job already occupying it, so the second job sits
    // queued long enough to be cancelled before any worker claims it.
    let orchestrator = Arc::new(Orchestrator::new(
        settings_with_concurrency("", 1),
        Arc::new(ScriptedConverter),
    ));
    orchestrator.start().await;
    let app = router(AppState {
        orchestrator: orchestrator.clone(),
    });

    let _occupant = orchestrator
        .enqueue("/tmp/hang.pdf".into(), ProcessingOptions::default(), None, None)
        .await;
    // Give the sole worker a moment to claim the occupant job first.
    for _ in 0..50 {
        let j = orchestrator.get(_occupant.id).await.unwrap();
        if j.state == docproc_service::job::JobState::Processing {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let queued = orchestrator
        .enqueue("/tmp/b.pdf".into(), ProcessingOptions::default(), None, None)
        .await;

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/v1/jobs/{}", queued.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let job = orchestrator.get(queued.id).await.unwrap();
    assert_eq!(job.state, docproc_service::job::JobState::Cancelled);
}

#[tokio::test]
async fn job_exceeding_its_deadline_fails_with_timeout() {
    let orchestrator = Arc::new(Orchestrator::new(settings(""), Arc::new(ScriptedConverter)));
    orchestrator.start().await;

    let job = orchestrator
        .enqueue(
            "/tmp/hang.pdf".into(),
            ProcessingOptions {
                timeout_seconds: Some(1),
                ..Default::default()
            },
            None,
            None,
        )
        .await;

    let mut final_job = None;
    for _ in 0..100 {
        let j = orchestrator.get(job.id).await.unwrap();
        if j.state.is_terminal() {
            final_job = Some(j);
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let job = final_job.expect("job should time out within 5s");
    assert_eq!(job.state, docproc_service::job::JobState::Failed);
    assert!(job.error.unwrap().contains("timeout after 1 seconds"));
}

#[tokio::test]
async fn panicking_engine_is_recovered_as_processing_error_and_worker_survives() {
    let orchestrator = Arc::new(Orchestrator::new(settings(""), Arc::new(ScriptedConverter)));
    orchestrator.start().await;

    let panicking = orchestrator
        .enqueue("/tmp/panic.pdf".into(), ProcessingOptions::default(), None, None)
        .await;

    let mut final_job = None;
    for _ in 0..50 {
        let j = orchestrator.get(panicking.id).await.unwrap();
        if j.state.is_terminal() {
            final_job = Some(j);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let job = final_job.expect("panicking job should still reach a terminal state");
    assert_eq!(job.state, docproc_service::job::JobState::Failed);
    assert_eq!(job.error_type, Some(docproc_service::job::ErrorType::ProcessingError));

    // The worker that absorbed the panic must still be alive and serving the queue.
    let next = orchestrator
        .enqueue("/tmp/a.pdf".into(), ProcessingOptions::default(), None, None)
        .await;
    for _ in 0..50 {
        let j = orchestrator.get(next.id).await.unwrap();
        if j.state == docproc_service::job::JobState::Completed {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("worker did not survive the panic to serve the next job");
}
