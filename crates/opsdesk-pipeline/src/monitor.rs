//! Failed-job monitor: turns interesting queue failures into alerts.
//!
//! The monitor hooks the queue's failure feed and re-raises failures that
//! look operationally relevant as [`AlertKind::JobFailure`] events. Its
//! own re-raises run on the monitoring lane, and monitoring-lane failures
//! are never re-raised, so a broken alert pipeline cannot feed itself.

use std::sync::Arc;

use tracing::{debug, error, warn};

use opsdesk_alerts::AlertEvent;
use opsdesk_queue::{JobFailure, JobQueue, Lane};

use crate::dispatcher::AlertDispatcher;

/// Job-name fragments that mark a failure as alert-worthy.
pub const JOB_NAME_KEYWORDS: &[&str] = &[
    "payment",
    "invoice",
    "billing",
    "email",
    "notification",
    "backup",
    "database",
    "security",
];

/// Error-message fragments that mark a failure as alert-worthy.
pub const ERROR_KEYWORDS: &[&str] = &[
    "database",
    "connection",
    "timeout",
    "memory",
    "permission",
    "auth",
    "out of disk",
];

/// Watches queue failures and raises alerts for the relevant ones.
pub struct FailedJobMonitor {
    dispatcher: Arc<AlertDispatcher>,
}

impl FailedJobMonitor {
    /// Creates a monitor raising through the given dispatcher.
    pub fn new(dispatcher: Arc<AlertDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Whether a failure warrants an alert.
    ///
    /// Case-insensitive: either the job name touches a business-critical
    /// area or the error message smells like infrastructure trouble.
    #[must_use]
    pub fn is_alert_worthy(failure: &JobFailure) -> bool {
        let name = failure.job_name.to_lowercase();
        let error = failure.error.to_lowercase();
        JOB_NAME_KEYWORDS.iter().any(|kw| name.contains(kw))
            || ERROR_KEYWORDS.iter().any(|kw| error.contains(kw))
    }

    /// Handles one failure from the queue's feed.
    pub fn observe(&self, failure: &JobFailure) {
        if failure.lane == Lane::Monitoring {
            debug!(job = %failure.job_name, "monitoring-lane failure, not re-raising");
            return;
        }
        if !Self::is_alert_worthy(failure) {
            warn!(
                job = %failure.job_name,
                lane = %failure.lane,
                error = %failure.error,
                "job failure below alert threshold"
            );
            return;
        }

        error!(
            job = %failure.job_name,
            lane = %failure.lane,
            error = %failure.error,
            "critical job failure, raising alert"
        );
        let event = AlertEvent::job_failure(
            failure.job_name.clone(),
            failure.error.clone(),
            failure.lane.as_str(),
            1,
        );
        self.dispatcher.raise_on(event, Lane::Monitoring);
    }

    /// Registers the monitor on the queue's failure feed.
    ///
    /// The hook keeps the monitor (and through it the dispatcher and the
    /// queue) alive, so a registered monitor is a process-lifetime fixture.
    pub fn register(self: &Arc<Self>, queue: &JobQueue) {
        let monitor = Arc::clone(self);
        queue.on_failure(Arc::new(move |failure| monitor.observe(failure)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::AlertListener;
    use crate::processor::{AlertProcessor, ProcessError, ProcessorRegistry};
    use crate::rate_limit::{MemoryRateLimitStore, RateLimiter};
    use futures::future::BoxFuture;
    use opsdesk_alerts::{Role, User};
    use opsdesk_notify::{
        MemoryNotificationStore, MemoryUserDirectory, NotificationStore, UserDirectory,
    };
    use std::sync::atomic::{AtomicU32, Ordering};
    use test_case::test_case;

    #[test_case("invoice-sync", "boom", true ; "invoice job name")]
    #[test_case("nightly-backup", "boom", true ; "backup job name")]
    #[test_case("warm-cache", "connection refused", true ; "connection error")]
    #[test_case("warm-cache", "OUT OF MEMORY", true ; "memory error uppercase")]
    #[test_case("nightly-report", "out of disk space", true ; "disk exhaustion error")]
    #[test_case("warm-cache", "bad template", false ; "uninteresting failure")]
    #[test_case("Payment-Capture", "boom", true ; "job name match is case insensitive")]
    fn classification(job_name: &str, error: &str, expected: bool) {
        let failure = JobFailure::new(job_name, Lane::Default, error);
        assert_eq!(FailedJobMonitor::is_alert_worthy(&failure), expected);
    }

    struct CountingProcessor {
        calls: Arc<AtomicU32>,
    }

    impl AlertProcessor for CountingProcessor {
        fn name(&self) -> &str {
            "counting"
        }

        fn process(&self, _event: &AlertEvent) -> BoxFuture<'_, Result<(), ProcessError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(()) })
        }
    }

    struct Rig {
        calls: Arc<AtomicU32>,
        queue: Arc<JobQueue>,
        monitor: Arc<FailedJobMonitor>,
    }

    fn rig() -> Rig {
        let calls = Arc::new(AtomicU32::new(0));
        let directory = Arc::new(MemoryUserDirectory::new());
        directory.add(User::new("Ada", "ada@example.com", Role::Admin));
        let notifications = Arc::new(MemoryNotificationStore::new());

        let listener = Arc::new(AlertListener::new(
            "admin",
            RateLimiter::new(Arc::new(MemoryRateLimitStore::new())),
            ProcessorRegistry::new(Arc::new(CountingProcessor {
                calls: Arc::clone(&calls),
            })),
            directory as Arc<dyn UserDirectory>,
            notifications as Arc<dyn NotificationStore>,
        ));
        let queue = Arc::new(JobQueue::start());
        let dispatcher = Arc::new(AlertDispatcher::new(listener, Arc::clone(&queue)));
        let monitor = Arc::new(FailedJobMonitor::new(dispatcher));

        Rig {
            calls,
            queue,
            monitor,
        }
    }

    async fn drain(rig: Rig) -> u32 {
        let Rig {
            calls,
            queue,
            monitor,
        } = rig;
        drop(monitor);
        let queue = Arc::try_unwrap(queue)
            .map_err(|_| "queue still shared")
            .unwrap();
        queue.shutdown().await;
        calls.load(Ordering::SeqCst)
    }

    #[tokio::test]
    async fn alert_worthy_failure_is_re_raised() {
        let rig = rig();
        rig.monitor
            .observe(&JobFailure::new("invoice-sync", Lane::Default, "boom"));
        assert_eq!(drain(rig).await, 1);
    }

    #[tokio::test]
    async fn uninteresting_failure_is_ignored() {
        let rig = rig();
        rig.monitor
            .observe(&JobFailure::new("warm-cache", Lane::Default, "bad template"));
        assert_eq!(drain(rig).await, 0);
    }

    #[tokio::test]
    async fn monitoring_lane_failure_is_never_re_raised() {
        let rig = rig();
        rig.monitor.observe(&JobFailure::new(
            "alert:job_failure",
            Lane::Monitoring,
            "connection refused",
        ));
        assert_eq!(drain(rig).await, 0);
    }

    #[tokio::test]
    async fn register_hooks_the_queue_feed() {
        let rig = rig();
        rig.monitor.register(&rig.queue);
        assert_eq!(rig.queue.hook_count(), 1);
    }
}
