//! The Opsdesk alert pipeline.
//!
//! Ties the event catalog, the delivery surfaces and the job queue into
//! one flow:
//!
//! 1. Application code raises an [`AlertEvent`](opsdesk_alerts::AlertEvent)
//!    through the [`AlertDispatcher`], which enqueues it and returns.
//! 2. The [`AlertListener`] runs on the alerts lane: dedup via the
//!    [`RateLimiter`], then severity-driven retry around the event's
//!    [`AlertProcessor`].
//! 3. A terminal failure leaves fallback notification records for admins
//!    and, per policy, an escalation for super admins.
//! 4. The [`FailedJobMonitor`] watches the queue's failure feed and
//!    re-raises alert-worthy job failures, on a lane whose own failures
//!    are never re-raised.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use opsdesk_alerts::AlertEvent;
//! use opsdesk_notify::{
//!     AlertBroadcast, AlertMailer, Broadcaster, Mailer, MemoryBroadcaster, MemoryMailer,
//!     MemoryNotificationStore, MemoryTemplateStore, MemoryUserDirectory, NotificationStore,
//!     TemplateStore, UserDirectory,
//! };
//! use opsdesk_pipeline::{
//!     AdminNotifyProcessor, AlertDispatcher, AlertListener, MemoryRateLimitStore,
//!     ProcessorRegistry, RateLimiter,
//! };
//! use opsdesk_queue::JobQueue;
//!
//! let queue = Arc::new(JobQueue::start());
//! let directory = Arc::new(MemoryUserDirectory::new()) as Arc<dyn UserDirectory>;
//! let notifications =
//!     Arc::new(MemoryNotificationStore::new()) as Arc<dyn NotificationStore>;
//! let mailer = Arc::new(AlertMailer::new(
//!     Arc::new(MemoryTemplateStore::with_defaults()) as Arc<dyn TemplateStore>,
//!     Arc::new(MemoryMailer::new()) as Arc<dyn Mailer>,
//!     Arc::clone(&notifications),
//! ));
//! let processor = Arc::new(AdminNotifyProcessor::new(
//!     Arc::clone(&directory),
//!     Arc::clone(&notifications),
//!     AlertBroadcast::new(Arc::new(MemoryBroadcaster::new()) as Arc<dyn Broadcaster>),
//!     mailer,
//!     Arc::clone(&queue),
//! ));
//! let listener = Arc::new(AlertListener::new(
//!     "admin",
//!     RateLimiter::new(Arc::new(MemoryRateLimitStore::new())),
//!     ProcessorRegistry::new(processor),
//!     directory,
//!     notifications,
//! ));
//! let dispatcher = AlertDispatcher::new(listener, queue);
//!
//! dispatcher.raise(AlertEvent::storage_warning("/var", 92, 90));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod dispatcher;
mod listener;
mod monitor;
mod processor;
mod rate_limit;

pub use dispatcher::{AlertDispatcher, ListenerJob};
pub use listener::{AlertListener, DeliveryOutcome};
pub use monitor::{FailedJobMonitor, ERROR_KEYWORDS, JOB_NAME_KEYWORDS};
pub use processor::{AdminNotifyProcessor, AlertProcessor, ProcessError, ProcessorRegistry};
pub use rate_limit::{MemoryRateLimitStore, RateLimitStore, RateLimiter, StoreError};
