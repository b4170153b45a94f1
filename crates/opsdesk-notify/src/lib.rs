//! Delivery surfaces for Opsdesk alerts.
//!
//! # Features
//!
//! - Port traits for the outside world: [`Mailer`], [`Broadcaster`],
//!   [`NotificationStore`], [`UserDirectory`], [`TemplateStore`]
//! - In-memory implementations for tests and single-node deployments
//! - [`AlertMailer`]: subject, priority headers, and a most-specific-first
//!   template chain, with a notification-record fallback on send failure
//! - [`AlertBroadcast`]: realtime publish on `admin.alerts.{category}`
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use opsdesk_alerts::AlertEvent;
//! use opsdesk_notify::{AlertBroadcast, Broadcaster, MemoryBroadcaster};
//!
//! # async fn example() {
//! let transport = Arc::new(MemoryBroadcaster::new());
//! let broadcast = AlertBroadcast::new(transport as Arc<dyn Broadcaster>);
//! let event = AlertEvent::storage_warning("/var", 92, 90);
//! broadcast.publish(&event).await.unwrap();
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod broadcast;
mod error;
mod interfaces;
mod mailer;

pub use broadcast::{broadcast_payload, channel_for, AlertBroadcast};
pub use error::{NotifyError, Result};
pub use interfaces::{
    Broadcaster, BroadcastMessage, Mailer, MemoryBroadcaster, MemoryMailer,
    MemoryNotificationStore, MemoryTemplateStore, MemoryUserDirectory, NotificationRecord,
    NotificationStore, TemplateStore, UserDirectory,
};
pub use mailer::{AlertMailRenderer, AlertMailer, Recipient, RenderedMail, DEFAULT_TEMPLATE};
