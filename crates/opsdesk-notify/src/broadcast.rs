//! Realtime broadcast of alerts to connected dashboard sessions.

use std::sync::Arc;

use serde_json::{json, Value};

use opsdesk_alerts::{AlertEvent, Category};

use crate::error::Result;
use crate::interfaces::Broadcaster;

/// Channel name for a category's alert feed: `admin.alerts.{category}`.
#[must_use]
pub fn channel_for(category: Category) -> String {
    format!("admin.alerts.{}", category.as_str())
}

/// Builds the wire payload for an event.
///
/// `initiated_by` is `null` rather than omitted when no user triggered the
/// event, so dashboard clients see a stable shape.
#[must_use]
pub fn broadcast_payload(event: &AlertEvent) -> Value {
    json!({
        "event_type": event.event_type(),
        "category": event.category().as_str(),
        "severity": event.severity().as_str(),
        "title": event.title(),
        "description": event.description(),
        "occurred_at": event.occurred_at.to_rfc3339(),
        "initiated_by": event.initiated_by,
        "action_url": event.action_url(),
    })
}

/// Publishes alert events on their category channel.
pub struct AlertBroadcast {
    broadcaster: Arc<dyn Broadcaster>,
}

impl AlertBroadcast {
    /// Creates the broadcast surface.
    pub fn new(broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self { broadcaster }
    }

    /// Publishes the event on `admin.alerts.{category}`.
    ///
    /// # Errors
    ///
    /// Propagates transport errors from the underlying [`Broadcaster`].
    pub async fn publish(&self, event: &AlertEvent) -> Result<()> {
        let channel = channel_for(event.category());
        self.broadcaster
            .publish(&channel, broadcast_payload(event))
            .await
    }
}
