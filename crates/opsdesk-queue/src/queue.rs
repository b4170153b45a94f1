//! The priority-lane job queue.
//!
//! One tokio worker task per lane drains an unbounded channel, so enqueue
//! is non-blocking from the producer's perspective: a request handler that
//! raises an alert never waits for delivery. Cross-lane ordering is not
//! guaranteed; within a lane jobs run sequentially in enqueue order.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, warn};

use crate::error::{QueueError, Result};
use crate::job::{Job, JobFailure};
use crate::lane::Lane;

/// Hook invoked for every job run that returns an error.
pub type FailureHook = Arc<dyn Fn(&JobFailure) + Send + Sync>;

struct QueuedJob {
    job: Box<dyn Job>,
}

/// A priority-lane background job queue.
///
/// Failure hooks registered with [`JobQueue::on_failure`] observe every
/// failed run on every lane. Hook dispatch is wrapped: a panicking hook is
/// caught and logged, never the end of the lane's worker. Hooks run inline
/// on the worker, so heavier work should go back through the queue (the
/// failed-job monitor enqueues onto [`Lane::Monitoring`] for exactly this
/// reason).
pub struct JobQueue {
    senders: HashMap<Lane, mpsc::UnboundedSender<QueuedJob>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    hooks: Arc<RwLock<Vec<FailureHook>>>,
}

impl JobQueue {
    /// Starts the queue: spawns one worker task per lane.
    #[must_use]
    pub fn start() -> Self {
        let hooks: Arc<RwLock<Vec<FailureHook>>> = Arc::new(RwLock::new(Vec::new()));
        let mut senders = HashMap::new();
        let mut workers = Vec::new();

        for lane in Lane::all() {
            let (tx, rx) = mpsc::unbounded_channel();
            senders.insert(lane, tx);
            workers.push(tokio::spawn(Self::worker_loop(
                lane,
                rx,
                Arc::clone(&hooks),
            )));
        }

        Self {
            senders,
            workers: Mutex::new(workers),
            hooks,
        }
    }

    /// Enqueues a job on the given lane.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::LaneClosed`] if the queue has been shut down.
    pub fn enqueue(&self, job: Box<dyn Job>, lane: Lane) -> Result<()> {
        let sender = self
            .senders
            .get(&lane)
            .ok_or(QueueError::LaneClosed { lane })?;
        debug!(job = %job.name(), %lane, "enqueued job");
        sender
            .send(QueuedJob { job })
            .map_err(|_| QueueError::LaneClosed { lane })
    }

    /// Enqueues a job to run after the given delay.
    ///
    /// The delay is awaited off-lane so delayed jobs do not hold up other
    /// work queued behind them.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::LaneClosed`] if the queue has been shut down.
    pub fn enqueue_delayed(&self, job: Box<dyn Job>, lane: Lane, delay: Duration) -> Result<()> {
        let sender = self
            .senders
            .get(&lane)
            .ok_or(QueueError::LaneClosed { lane })?
            .clone();
        debug!(job = %job.name(), %lane, delay_secs = delay.as_secs(), "scheduled delayed job");
        tokio::spawn(async move {
            sleep(delay).await;
            if sender.send(QueuedJob { job }).is_err() {
                warn!(%lane, "lane closed before delayed job could be enqueued");
            }
        });
        Ok(())
    }

    /// Registers a hook observing every failed job run.
    pub fn on_failure(&self, hook: FailureHook) {
        self.hooks.write().push(hook);
    }

    /// Number of registered failure hooks.
    #[must_use]
    pub fn hook_count(&self) -> usize {
        self.hooks.read().len()
    }

    /// Shuts the queue down: closes all lanes and waits for workers to
    /// drain what they already hold.
    pub async fn shutdown(self) {
        drop(self.senders);
        for worker in self.workers.into_inner() {
            if let Err(e) = worker.await {
                warn!(error = %e, "queue worker ended abnormally");
            }
        }
    }

    async fn worker_loop(
        lane: Lane,
        mut rx: mpsc::UnboundedReceiver<QueuedJob>,
        hooks: Arc<RwLock<Vec<FailureHook>>>,
    ) {
        debug!(%lane, "queue worker started");
        while let Some(queued) = rx.recv().await {
            let name = queued.job.name().to_string();
            match queued.job.run().await {
                Ok(()) => debug!(job = %name, %lane, "job succeeded"),
                Err(e) => {
                    warn!(job = %name, %lane, error = %e, "job failed");
                    let failure = JobFailure::new(name, lane, e.message);
                    let hooks = hooks.read().clone();
                    for hook in &hooks {
                        if catch_unwind(AssertUnwindSafe(|| hook(&failure))).is_err() {
                            error!(job = %failure.job_name, %lane, "failure hook panicked");
                        }
                    }
                }
            }
        }
        debug!(%lane, "queue worker stopped");
    }
}
