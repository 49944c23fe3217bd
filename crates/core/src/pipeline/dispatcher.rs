//! Pipeline dispatcher: owns the stage channels and the worker pools.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::messaging::{escape_markdown, InboundMessage};
use crate::metrics::{STAGE_DURATION, STAGE_OUTCOMES, TASKS_REJECTED, TASKS_SUBMITTED};

use super::channel::{stage_channel, StageReceiver, StageSender};
use super::config::PipelineConfig;
use super::error::PipelineError;
use super::handlers::{Collaborators, StageHandlers};
use super::types::{PipelineStatus, PoolStatus, Stage, TaskEnvelope, TaskEvent};

/// Reply to a request that is not a link. The echoed text is escaped.
pub fn invalid_request_reply(text: &str) -> String {
    format!(
        "This seems not to be a valid link starting with https: {}",
        escape_markdown(text)
    )
}

/// Whether `text` looks enough like a link to be worth fetching.
pub fn is_plausible_link(text: &str) -> bool {
    text.starts_with("http")
}

/// Tracks statistics for one stage's worker pool.
#[derive(Default)]
struct PoolStats {
    workers: AtomicUsize,
    active: AtomicU64,
    total_processed: AtomicU64,
    total_failed: AtomicU64,
}

impl PoolStats {
    fn to_status(&self, stage: Stage, queued: usize) -> PoolStatus {
        PoolStatus {
            stage,
            max_concurrent: self.workers.load(Ordering::Relaxed),
            active_jobs: self.active.load(Ordering::Relaxed) as usize,
            queued_jobs: queued,
            total_processed: self.total_processed.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
        }
    }
}

/// One stage's inbound channel and pool statistics.
struct StageLane {
    stage: Stage,
    tx: StageSender<TaskEnvelope>,
    rx: StageReceiver<TaskEnvelope>,
    stats: Arc<PoolStats>,
}

impl StageLane {
    fn new(stage: Stage) -> Self {
        let (tx, rx) = stage_channel();
        Self {
            stage,
            tx,
            rx,
            stats: Arc::new(PoolStats::default()),
        }
    }

    fn status(&self) -> PoolStatus {
        self.stats.to_status(self.stage, self.tx.waiting())
    }
}

/// Everything a worker needs, cloned per worker.
struct Worker {
    id: usize,
    stage: Stage,
    rx: StageReceiver<TaskEnvelope>,
    next: Option<StageSender<TaskEnvelope>>,
    stats: Arc<PoolStats>,
    handlers: Arc<StageHandlers>,
    shutdown: broadcast::Receiver<()>,
}

impl Worker {
    async fn run(mut self) {
        debug!(stage = %self.stage, worker = self.id, "Worker starting");

        loop {
            let envelope = tokio::select! {
                biased;
                _ = self.shutdown.recv() => break,
                received = self.rx.recv() => match received {
                    Some(envelope) => envelope,
                    None => {
                        warn!(stage = %self.stage, worker = self.id, "Stage channel closed");
                        break;
                    }
                },
            };

            if !self.process(envelope).await {
                break;
            }
        }

        debug!(stage = %self.stage, worker = self.id, "Worker stopped");
    }

    /// Runs the handler and forwards the result. Returns `false` on shutdown.
    async fn process(&mut self, envelope: TaskEnvelope) -> bool {
        let task_id = envelope.task_id;
        let stage = self.stage.as_str();
        let start = Instant::now();
        self.stats.active.fetch_add(1, Ordering::Relaxed);

        let result = self.handlers.handle(self.stage, envelope).await;
        let elapsed = start.elapsed().as_secs_f64();

        let keep_running = match result {
            Ok(forward) => {
                self.stats.total_processed.fetch_add(1, Ordering::Relaxed);
                STAGE_OUTCOMES.with_label_values(&[stage, "success"]).inc();
                STAGE_DURATION
                    .with_label_values(&[stage, "success"])
                    .observe(elapsed);
                info!(%task_id, stage, worker = self.id, duration_secs = elapsed, "Stage completed");

                match (forward, self.next.clone()) {
                    (Some(envelope), Some(next)) => self.forward(next, envelope).await,
                    _ => true,
                }
            }
            Err(e) => {
                self.stats.total_failed.fetch_add(1, Ordering::Relaxed);
                STAGE_OUTCOMES.with_label_values(&[stage, "failed"]).inc();
                STAGE_DURATION
                    .with_label_values(&[stage, "failed"])
                    .observe(elapsed);
                warn!(%task_id, stage, worker = self.id, "Task failed: {}", e);

                self.handlers.emit(TaskEvent::Failed {
                    task_id,
                    stage: e.stage().unwrap_or(self.stage),
                    error: e.to_string(),
                });
                true
            }
        };

        self.stats.active.fetch_sub(1, Ordering::Relaxed);
        keep_running
    }

    /// Blocking hand-off to the next stage, abandoned on shutdown.
    async fn forward(&mut self, next: StageSender<TaskEnvelope>, envelope: TaskEnvelope) -> bool {
        let task_id = envelope.task_id;
        tokio::select! {
            biased;
            _ = self.shutdown.recv() => {
                warn!(%task_id, stage = %self.stage, "Shutdown while forwarding, task dropped");
                false
            }
            sent = next.send(envelope) => {
                if sent.is_err() {
                    warn!(%task_id, stage = %self.stage, "Next stage closed, task dropped");
                }
                true
            }
        }
    }
}

/// Owns the stage channels, starts the worker pools, accepts requests.
///
/// # Example
///
/// ```ignore
/// let dispatcher = PipelineDispatcher::new(config.pipeline_config(), collaborators);
/// dispatcher.start(5, 2, 5).await?;
/// dispatcher.submit(inbound).await?;
/// ```
pub struct PipelineDispatcher {
    handlers: Arc<StageHandlers>,
    fetch: StageLane,
    transcode: StageLane,
    publish: StageLane,
    started: AtomicBool,
    running: AtomicBool,
    shutdown_tx: broadcast::Sender<()>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl PipelineDispatcher {
    /// Creates a dispatcher. Nothing runs until [`start`](Self::start).
    pub fn new(config: PipelineConfig, collaborators: Collaborators) -> Self {
        Self::build(config, collaborators, None)
    }

    /// Creates a dispatcher that reports progress on `events`.
    pub fn with_events(
        config: PipelineConfig,
        collaborators: Collaborators,
        events: mpsc::Sender<TaskEvent>,
    ) -> Self {
        Self::build(config, collaborators, Some(events))
    }

    fn build(
        config: PipelineConfig,
        collaborators: Collaborators,
        events: Option<mpsc::Sender<TaskEvent>>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            handlers: Arc::new(StageHandlers::new(config, collaborators, events)),
            fetch: StageLane::new(Stage::Fetch),
            transcode: StageLane::new(Stage::Transcode),
            publish: StageLane::new(Stage::Publish),
            started: AtomicBool::new(false),
            running: AtomicBool::new(false),
            shutdown_tx,
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Spawns the worker pools. Callable once.
    ///
    /// A stage with zero workers never drains; sends to it block forever.
    pub async fn start(
        &self,
        fetch_workers: usize,
        transcode_workers: usize,
        publish_workers: usize,
    ) -> Result<(), PipelineError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(PipelineError::AlreadyStarted);
        }

        let mut handles = self.workers.lock().await;
        for (lane, count, next) in [
            (&self.fetch, fetch_workers, Some(&self.transcode.tx)),
            (&self.transcode, transcode_workers, Some(&self.publish.tx)),
            (&self.publish, publish_workers, None),
        ] {
            lane.stats.workers.store(count, Ordering::Relaxed);
            if count == 0 {
                warn!(stage = %lane.stage, "Stage has no workers and will never drain");
            }

            for id in 0..count {
                let worker = Worker {
                    id,
                    stage: lane.stage,
                    rx: lane.rx.clone(),
                    next: next.cloned(),
                    stats: Arc::clone(&lane.stats),
                    handlers: Arc::clone(&self.handlers),
                    shutdown: self.shutdown_tx.subscribe(),
                };
                handles.push(tokio::spawn(worker.run()));
            }
        }

        self.running.store(true, Ordering::SeqCst);
        info!(
            fetch_workers,
            transcode_workers,
            publish_workers,
            archive_enabled = self.handlers.archive_enabled(),
            "Pipeline started"
        );
        Ok(())
    }

    /// Accepts a request and hands it to a fetch worker.
    ///
    /// Blocks until a fetch worker is free. Text that is not a link gets an
    /// immediate reply and [`PipelineError::InvalidRequestShape`].
    pub async fn submit(&self, request: InboundMessage) -> Result<(), PipelineError> {
        // Subscribe before checking `running` so a concurrent stop is never missed.
        let mut shutdown = self.shutdown_tx.subscribe();
        if !self.running.load(Ordering::SeqCst) {
            return Err(PipelineError::NotRunning);
        }

        if !is_plausible_link(&request.text) {
            TASKS_REJECTED.inc();
            debug!(chat_id = request.requester.chat_id, "Rejected request that is not a link");
            let reply = invalid_request_reply(&request.text);
            if let Err(e) = self.handlers.reply(request.requester.chat_id, &reply).await {
                warn!(chat_id = request.requester.chat_id, "Failed to reply to request: {}", e);
            }
            return Err(PipelineError::InvalidRequestShape { text: request.text });
        }

        let envelope = TaskEnvelope::new(request);
        let task_id = envelope.task_id;
        debug!(%task_id, locator = %envelope.source_locator, "Submitting task");

        tokio::select! {
            biased;
            _ = shutdown.recv() => Err(PipelineError::NotRunning),
            sent = self.fetch.tx.send(envelope) => {
                sent.map_err(|_| PipelineError::NotRunning)?;
                TASKS_SUBMITTED.inc();
                info!(%task_id, "Task accepted");
                Ok(())
            }
        }
    }

    /// Signals every worker to stop and waits for them.
    ///
    /// Handlers already running finish; envelopes waiting for a hand-off are dropped.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            debug!("Pipeline not running");
            return;
        }

        info!("Stopping pipeline");
        let _ = self.shutdown_tx.send(());

        let handles: Vec<_> = self.workers.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Worker ended abnormally: {}", e);
            }
        }

        info!("Pipeline stopped");
    }

    /// Whether workers are running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Snapshot of the pools.
    pub fn status(&self) -> PipelineStatus {
        PipelineStatus {
            running: self.is_running(),
            archive_enabled: self.handlers.archive_enabled(),
            fetch_pool: self.fetch.status(),
            transcode_pool: self.transcode.status(),
            publish_pool: self.publish.status(),
        }
    }
}
