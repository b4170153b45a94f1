//! The alert listener: dedup, retry and terminal-failure handling.
//!
//! One `handle` call is one delivery. The listener consults the rate
//! limiter, then runs the event's processor under the severity's timeout,
//! retrying per the severity's backoff schedule. A delivery that exhausts
//! its attempts (or hits a terminal error) produces fallback notification
//! records for admins and, where the policy says so, an escalation for
//! super admins.

use std::sync::Arc;

use serde_json::json;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn, Level};

use opsdesk_alerts::{AlertEvent, Role, Severity};
use opsdesk_notify::{NotificationStore, UserDirectory};

use crate::processor::{ProcessError, ProcessorRegistry};
use crate::rate_limit::RateLimiter;

/// What a `handle` call did with the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// A delivery for the same key happened within its TTL window.
    Suppressed,
    /// The processor succeeded, on the given attempt.
    Succeeded {
        /// Attempts consumed, counting the successful one.
        attempts: u32,
    },
    /// Every allowed attempt failed, or a terminal error ended delivery.
    TerminallyFailed {
        /// Attempts consumed.
        attempts: u32,
        /// The last error seen.
        error: String,
    },
}

/// Delivers alert events with dedup and severity-driven retry.
pub struct AlertListener {
    name: String,
    limiter: RateLimiter,
    processors: ProcessorRegistry,
    directory: Arc<dyn UserDirectory>,
    notifications: Arc<dyn NotificationStore>,
}

impl AlertListener {
    /// Creates a listener.
    pub fn new(
        name: impl Into<String>,
        limiter: RateLimiter,
        processors: ProcessorRegistry,
        directory: Arc<dyn UserDirectory>,
        notifications: Arc<dyn NotificationStore>,
    ) -> Self {
        Self {
            name: name.into(),
            limiter,
            processors,
            directory,
            notifications,
        }
    }

    /// The listener's name, used in dedup keys and escalation records.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a terminal failure at this severity and attempt count
    /// escalates to super admins.
    ///
    /// Critical always escalates. Other severities escalate only when the
    /// retry budget was actually exhausted and the policy allowed more
    /// than one attempt, so single-attempt low alerts fail quietly into
    /// fallback records.
    #[must_use]
    pub fn should_escalate(severity: Severity, attempts: u32) -> bool {
        severity == Severity::Critical
            || (attempts >= severity.max_tries() && severity.max_tries() > 1)
    }

    /// Logs a successful delivery at the severity's mapped level.
    fn log_delivered(&self, event: &AlertEvent, attempt: u32) {
        let listener = self.name.as_str();
        let event_type = event.event_type();
        match event.severity().tracing_level() {
            Level::ERROR => error!(listener, event_type, attempt, "alert delivered"),
            Level::WARN => warn!(listener, event_type, attempt, "alert delivered"),
            Level::INFO => info!(listener, event_type, attempt, "alert delivered"),
            _ => debug!(listener, event_type, attempt, "alert delivered"),
        }
    }

    /// Runs one delivery for the event.
    pub async fn handle(&self, event: &AlertEvent) -> DeliveryOutcome {
        if self.limiter.is_duplicate(&self.name, event).await {
            return DeliveryOutcome::Suppressed;
        }
        self.limiter.mark_sent(&self.name, event).await;

        let severity = event.severity();
        let max_tries = severity.max_tries();
        let attempt_timeout = severity.timeout();
        let processor = self.processors.for_event(event);

        let mut attempt = 0;
        let error = loop {
            attempt += 1;
            match timeout(attempt_timeout, processor.process(event)).await {
                Ok(Ok(())) => {
                    self.log_delivered(event, attempt);
                    return DeliveryOutcome::Succeeded { attempts: attempt };
                }
                Ok(Err(ProcessError::Terminal { reason })) => {
                    warn!(
                        listener = %self.name,
                        event_type = %event.event_type(),
                        attempt,
                        error = %reason,
                        "terminal delivery error"
                    );
                    break reason;
                }
                Ok(Err(ProcessError::Retryable { reason })) => {
                    if attempt >= max_tries {
                        break reason;
                    }
                    let backoff = severity.backoff_for_attempt(attempt);
                    error!(
                        listener = %self.name,
                        event_type = %event.event_type(),
                        attempt,
                        error = %reason,
                        backoff_secs = backoff.as_secs(),
                        "delivery attempt failed, backing off"
                    );
                    sleep(backoff).await;
                }
                Err(_) => {
                    let reason = format!(
                        "delivery attempt timed out after {}s",
                        attempt_timeout.as_secs()
                    );
                    if attempt >= max_tries {
                        break reason;
                    }
                    let backoff = severity.backoff_for_attempt(attempt);
                    error!(
                        listener = %self.name,
                        event_type = %event.event_type(),
                        attempt,
                        backoff_secs = backoff.as_secs(),
                        "delivery attempt timed out, backing off"
                    );
                    sleep(backoff).await;
                }
            }
        };

        self.on_terminal_failure(event, attempt, &error).await;
        DeliveryOutcome::TerminallyFailed {
            attempts: attempt,
            error,
        }
    }

    /// Records fallback notifications and, per policy, an escalation.
    ///
    /// Everything here is best effort: a failing store or directory is
    /// logged and skipped, never propagated, since this path already runs
    /// because something else is broken.
    async fn on_terminal_failure(&self, event: &AlertEvent, attempts: u32, error: &str) {
        error!(
            listener = %self.name,
            event_type = %event.event_type(),
            attempts,
            error,
            "alert delivery terminally failed"
        );

        let fallback = json!({
            "title": event.title(),
            "description": event.description(),
            "error": error,
            "attempts": attempts,
        });
        match self.directory.users_with_role(Role::Admin).await {
            Ok(admins) => {
                for admin in admins {
                    if let Err(e) = self
                        .notifications
                        .create(admin.id, "alert_fallback", fallback.clone())
                        .await
                    {
                        warn!(user = %admin.id, error = %e, "fallback record failed");
                    }
                }
            }
            Err(e) => warn!(error = %e, "could not list admins for fallback"),
        }

        if !Self::should_escalate(event.severity(), attempts) {
            return;
        }

        let escalation = json!({
            "title": event.title(),
            "description": event.description(),
            "error": error,
            "attempts": attempts,
            "listener": self.name,
        });
        match self.directory.users_with_role(Role::SuperAdmin).await {
            Ok(supers) => {
                for user in supers {
                    if let Err(e) = self
                        .notifications
                        .create(user.id, "alert_escalation", escalation.clone())
                        .await
                    {
                        warn!(user = %user.id, error = %e, "escalation record failed");
                    }
                }
            }
            Err(e) => warn!(error = %e, "could not list super admins for escalation"),
        }
    }
}
