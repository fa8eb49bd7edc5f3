//! Sole owner of the job registry and intake queue. Implements the public
//! operations; the actual per-job work lives in `worker.rs`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::Settings;
use crate::engine::Converter;
use crate::job::{Job, JobState, ProcessingOptions};
use crate::worker;

pub enum CancelOutcome {
    Cancelled,
    NotFound,
    NotCancellable,
}

pub struct Orchestrator {
    pub settings: Arc<Settings>,
    registry: Arc<RwLock<HashMap<Uuid, Job>>>,
    tx: mpsc::UnboundedSender<Uuid>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<Uuid>>>,
    queue_size: Arc<AtomicUsize>,
    engine: Arc<dyn Converter>,
    shutdown: CancellationToken,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Orchestrator {
    pub fn new(settings: Arc<Settings>, engine: Arc<dyn Converter>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Orchestrator {
            settings,
            registry: Arc::new(RwLock::new(HashMap::new())),
            tx,
            rx: Arc::new(Mutex::new(rx)),
            queue_size: Arc::new(AtomicUsize::new(0)),
            engine,
            shutdown: CancellationToken::new(),
            workers: Mutex::new(Vec::new()),
        }
    }

    pub async fn start(&self) {
        let num_workers = self.settings.max_concurrent_jobs as usize;
        tracing::info!(num_workers, "queue_starting");

        let mut workers = self.workers.lock().await;
        for worker_id in 0..num_workers {
            let handle = tokio::spawn(worker::run(
                worker_id,
                self.registry.clone(),
                self.rx.clone(),
                self.queue_size.clone(),
                self.shutdown.clone(),
                self.settings.clone(),
                self.engine.clone(),
            ));
            workers.push(handle);
        }
        tracing::info!(num_workers = workers.len(), "queue_started");
    }

    pub async fn stop(&self) {
        tracing::info!("queue_stopping");
        self.shutdown.cancel();

        let mut workers = self.workers.lock().await;
        for handle in workers.drain(..) {
            if let Err(error) = handle.await {
                tracing::warn!(%error, "worker_join_failed");
            }
        }
        tracing::info!("queue_stopped");
    }

    pub async fn enqueue(
        &self,
        file_path: String,
        options: ProcessingOptions,
        trace_id: Option<String>,
        correlation_id: Option<String>,
    ) -> Job {
        let trace_id = trace_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let job = Job::new(file_path, options, trace_id, correlation_id);
        self.register(job.clone()).await;
        self.release(&job);
        job
    }

    /// Insert a job into the registry without making it visible to workers yet.
    /// Used by `enqueue_batch` so every sibling exists before any of them can start.
    async fn register(&self, job: Job) {
        let mut reg = self.registry.write().await;
        reg.insert(job.id, job);
    }

    /// Make a registered job visible to the intake queue.
    fn release(&self, job: &Job) {
        let _ = self.tx.send(job.id);
        let queue_size = self.queue_size.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(
            job_id = %job.id,
            file_path = %job.file_path,
            trace_id = %job.trace_id,
            correlation_id = ?job.correlation_id,
            queue_size,
            "job_enqueued"
        );
    }

    pub async fn enqueue_batch(
        &self,
        file_paths: Vec<String>,
        options: ProcessingOptions,
        trace_id: Option<String>,
    ) -> (String, Vec<Uuid>) {
        let correlation_id = Uuid::new_v4().to_string();
        let mut jobs = Vec::with_capacity(file_paths.len());
        for file_path in file_paths {
            let trace_id = trace_id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
            let job = Job::new(file_path, options.clone(), trace_id, Some(correlation_id.clone()));
            jobs.push(job);
        }

        // Register every sibling first so none can start processing while
        // others are still being created — only then release them to the queue.
        for job in &jobs {
            self.register(job.clone()).await;
        }
        let job_ids: Vec<Uuid> = jobs.iter().map(|j| j.id).collect();
        for job in &jobs {
            self.release(job);
        }

        (correlation_id, job_ids)
    }

    pub async fn get(&self, id: Uuid) -> Option<Job> {
        self.registry.read().await.get(&id).cloned()
    }

    pub async fn list(&self) -> Vec<Job> {
        self.registry.read().await.values().cloned().collect()
    }

    pub async fn cancel(&self, id: Uuid) -> CancelOutcome {
        let mut reg = self.registry.write().await;
        let Some(job) = reg.get_mut(&id) else {
            return CancelOutcome::NotFound;
        };
        if job.state != JobState::Queued {
            return CancelOutcome::NotCancellable;
        }
        job.state = JobState::Cancelled;
        job.completed_at = Some(chrono::Utc::now());
        job.progress = 100;
        tracing::info!(job_id = %id, trace_id = %job.trace_id, "job_cancelled");
        CancelOutcome::Cancelled
    }

    pub fn size(&self) -> usize {
        self.queue_size.load(Ordering::SeqCst)
    }

    pub async fn active_count(&self) -> usize {
        self.registry
            .read()
            .await
            .values()
            .filter(|j| j.state == JobState::Processing)
            .count()
    }
}
