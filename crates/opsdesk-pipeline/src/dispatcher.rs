//! The dispatcher: the one entry point callers use to raise an alert.
//!
//! `raise` hands the event to the queue and returns immediately. Delivery,
//! retry and failure handling all happen on the alerts lane, so the code
//! path raising an alert (often a request handler already dealing with a
//! problem) never blocks and never sees a delivery error.

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, error};

use opsdesk_alerts::AlertEvent;
use opsdesk_queue::{Job, JobError, JobQueue, Lane};

use crate::listener::{AlertListener, DeliveryOutcome};

/// Queue job wrapping one delivery of one event.
pub struct ListenerJob {
    name: String,
    listener: Arc<AlertListener>,
    event: AlertEvent,
}

impl ListenerJob {
    /// Wraps an event for delivery by the given listener.
    #[must_use]
    pub fn new(listener: Arc<AlertListener>, event: AlertEvent) -> Self {
        Self {
            name: format!("alert:{}", event.event_type()),
            listener,
            event,
        }
    }
}

impl Job for ListenerJob {
    fn name(&self) -> &str {
        &self.name
    }

    /// Runs the delivery. A terminal failure surfaces as a job error so
    /// queue failure hooks (the failed-job monitor among them) see it;
    /// suppression and success are both a clean run.
    fn run(&self) -> BoxFuture<'_, Result<(), JobError>> {
        Box::pin(async move {
            match self.listener.handle(&self.event).await {
                DeliveryOutcome::Suppressed | DeliveryOutcome::Succeeded { .. } => Ok(()),
                DeliveryOutcome::TerminallyFailed { error, .. } => Err(JobError::new(error)),
            }
        })
    }
}

/// Raises alert events onto the queue.
pub struct AlertDispatcher {
    listener: Arc<AlertListener>,
    queue: Arc<JobQueue>,
}

impl AlertDispatcher {
    /// Creates a dispatcher delivering through the given listener.
    pub fn new(listener: Arc<AlertListener>, queue: Arc<JobQueue>) -> Self {
        Self { listener, queue }
    }

    /// Raises an event for background delivery.
    ///
    /// Never fails from the caller's point of view: if the queue is shut
    /// down the event is dropped with an error log.
    pub fn raise(&self, event: AlertEvent) {
        self.raise_on(event, Lane::Alerts);
    }

    /// Raises an event onto a specific lane.
    ///
    /// The failed-job monitor uses this to keep its own re-raises on the
    /// monitoring lane, where their failures are never re-raised again.
    pub fn raise_on(&self, event: AlertEvent, lane: Lane) {
        debug!(event_type = %event.event_type(), %lane, "raising alert");
        let job = ListenerJob::new(Arc::clone(&self.listener), event);
        if let Err(e) = self.queue.enqueue(Box::new(job), lane) {
            error!(error = %e, "alert dropped, queue unavailable");
        }
    }
}
