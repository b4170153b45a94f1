//! Alert processors: what a delivery attempt actually does.
//!
//! A processor owns one delivery strategy. The registry routes each event
//! to the processor registered for its category, falling back to the
//! default processor, which is how a deployment gives security events a
//! different treatment than business ones without touching the listener.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use opsdesk_alerts::{sanitize_context, AlertEvent, Category, Role};
use opsdesk_notify::{
    AlertBroadcast, AlertMailer, NotificationStore, NotifyError, Recipient, UserDirectory,
};
use opsdesk_queue::{FnJob, JobError, JobQueue, Lane};

/// Error from a delivery attempt.
///
/// The variant decides what the listener does next: retryable errors go
/// back around the attempt loop, terminal ones end delivery immediately.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Transient failure, worth another attempt.
    #[error("retryable: {reason}")]
    Retryable {
        /// What went wrong.
        reason: String,
    },

    /// Permanent failure, retrying cannot help.
    #[error("terminal: {reason}")]
    Terminal {
        /// What went wrong.
        reason: String,
    },
}

impl ProcessError {
    /// Transient failure.
    #[must_use]
    pub fn retryable(reason: impl Into<String>) -> Self {
        Self::Retryable {
            reason: reason.into(),
        }
    }

    /// Permanent failure.
    #[must_use]
    pub fn terminal(reason: impl Into<String>) -> Self {
        Self::Terminal {
            reason: reason.into(),
        }
    }
}

/// One delivery strategy for alert events.
pub trait AlertProcessor: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Performs one delivery attempt for the event.
    fn process(&self, event: &AlertEvent) -> BoxFuture<'_, Result<(), ProcessError>>;
}

/// Routes events to a processor by category.
pub struct ProcessorRegistry {
    by_category: HashMap<Category, Arc<dyn AlertProcessor>>,
    default: Arc<dyn AlertProcessor>,
}

impl ProcessorRegistry {
    /// Creates a registry with only a default processor.
    pub fn new(default: Arc<dyn AlertProcessor>) -> Self {
        Self {
            by_category: HashMap::new(),
            default,
        }
    }

    /// Registers a processor for a category.
    #[must_use]
    pub fn with_processor(mut self, category: Category, processor: Arc<dyn AlertProcessor>) -> Self {
        self.by_category.insert(category, processor);
        self
    }

    /// The processor handling this event.
    #[must_use]
    pub fn for_event(&self, event: &AlertEvent) -> Arc<dyn AlertProcessor> {
        self.by_category
            .get(&event.category())
            .map_or_else(|| Arc::clone(&self.default), Arc::clone)
    }
}

/// The standard delivery: notification records for every admin, a
/// realtime broadcast, and mail for severities that warrant it.
pub struct AdminNotifyProcessor {
    directory: Arc<dyn UserDirectory>,
    notifications: Arc<dyn NotificationStore>,
    broadcast: AlertBroadcast,
    mailer: Arc<AlertMailer>,
    queue: Arc<JobQueue>,
}

impl AdminNotifyProcessor {
    /// Wires the processor to its delivery surfaces.
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        notifications: Arc<dyn NotificationStore>,
        broadcast: AlertBroadcast,
        mailer: Arc<AlertMailer>,
        queue: Arc<JobQueue>,
    ) -> Self {
        Self {
            directory,
            notifications,
            broadcast,
            mailer,
            queue,
        }
    }

    fn map_err(e: NotifyError) -> ProcessError {
        ProcessError::retryable(e.to_string())
    }
}

impl AlertProcessor for AdminNotifyProcessor {
    fn name(&self) -> &str {
        "admin_notify"
    }

    fn process(&self, event: &AlertEvent) -> BoxFuture<'_, Result<(), ProcessError>> {
        let event = event.clone();
        Box::pin(async move {
            let admins = self
                .directory
                .users_with_role(Role::Admin)
                .await
                .map_err(Self::map_err)?;

            let record = json!({
                "event_type": event.event_type(),
                "category": event.category().as_str(),
                "severity": event.severity().as_str(),
                "title": event.title(),
                "description": event.description(),
                "action_url": event.action_url(),
                "context": sanitize_context(&event.context),
            });
            for admin in &admins {
                self.notifications
                    .create(admin.id, "alert", record.clone())
                    .await
                    .map_err(Self::map_err)?;
            }

            self.broadcast.publish(&event).await.map_err(Self::map_err)?;

            if event.severity().sends_email() {
                for admin in &admins {
                    let recipient = Recipient::from(admin);
                    let mailer = Arc::clone(&self.mailer);
                    let mail_event = event.clone();
                    let job_name = format!("alert-mail:{}", event.event_type());
                    let job = FnJob::new(job_name, move || {
                        let mailer = Arc::clone(&mailer);
                        let event = mail_event.clone();
                        let recipient = recipient.clone();
                        Box::pin(async move {
                            mailer
                                .deliver(&event, &recipient)
                                .await
                                .map_err(|e| JobError::new(e.to_string()))
                        })
                    });
                    self.queue
                        .enqueue(Box::new(job), Lane::for_severity(event.severity()))
                        .map_err(|e| ProcessError::terminal(e.to_string()))?;
                }
            }

            debug!(
                event_type = %event.event_type(),
                admins = admins.len(),
                "alert delivered"
            );
            Ok(())
        })
    }
}
