//! Delivery-side port traits and in-memory implementations.
//!
//! The pipeline talks to the outside world only through these traits;
//! production wiring supplies database- or transport-backed versions,
//! tests and single-node deployments use the in-memory ones.

use std::collections::HashMap;

use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use opsdesk_alerts::{Role, User};

use crate::error::{NotifyError, Result};
use crate::mailer::{Recipient, RenderedMail};

/// Looks up users by role.
pub trait UserDirectory: Send + Sync {
    /// Returns all users holding the given role.
    fn users_with_role(&self, role: Role) -> BoxFuture<'_, Result<Vec<User>>>;
}

/// Persists in-app notification records.
pub trait NotificationStore: Send + Sync {
    /// Creates a notification record for a user.
    fn create(&self, user_id: Uuid, kind: &str, data: Value) -> BoxFuture<'_, Result<()>>;
}

/// Publishes payloads onto named realtime channels.
pub trait Broadcaster: Send + Sync {
    /// Publishes a payload on a channel.
    fn publish(&self, channel: &str, payload: Value) -> BoxFuture<'_, Result<()>>;
}

/// Sends rendered mail to a recipient.
pub trait Mailer: Send + Sync {
    /// Delivers a rendered mail.
    fn send(&self, mail: &RenderedMail, recipient: &Recipient) -> BoxFuture<'_, Result<()>>;
}

/// Resolves and renders mail templates by id.
pub trait TemplateStore: Send + Sync {
    /// Whether a template with this id exists.
    fn exists(&self, id: &str) -> bool;

    /// Renders a template with the given data.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::TemplateMissing`] if the id is unknown.
    fn render(&self, id: &str, data: &Value) -> Result<String>;
}

/// In-memory user directory.
#[derive(Default)]
pub struct MemoryUserDirectory {
    users: RwLock<Vec<User>>,
}

impl MemoryUserDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user.
    pub fn add(&self, user: User) {
        self.users.write().push(user);
    }
}

impl UserDirectory for MemoryUserDirectory {
    fn users_with_role(&self, role: Role) -> BoxFuture<'_, Result<Vec<User>>> {
        let matching: Vec<User> = self
            .users
            .read()
            .iter()
            .filter(|u| u.role == role)
            .cloned()
            .collect();
        Box::pin(async move { Ok(matching) })
    }
}

/// A stored in-app notification.
#[derive(Debug, Clone)]
pub struct NotificationRecord {
    /// The user the notification belongs to.
    pub user_id: Uuid,
    /// Record kind, e.g. `alert` or `alert_fallback`.
    pub kind: String,
    /// Structured notification payload.
    pub data: Value,
}

/// In-memory notification store.
#[derive(Default)]
pub struct MemoryNotificationStore {
    records: RwLock<Vec<NotificationRecord>>,
}

impl MemoryNotificationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All records written so far.
    #[must_use]
    pub fn records(&self) -> Vec<NotificationRecord> {
        self.records.read().clone()
    }

    /// Records of a given kind.
    #[must_use]
    pub fn records_of_kind(&self, kind: &str) -> Vec<NotificationRecord> {
        self.records
            .read()
            .iter()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect()
    }
}

impl NotificationStore for MemoryNotificationStore {
    fn create(&self, user_id: Uuid, kind: &str, data: Value) -> BoxFuture<'_, Result<()>> {
        self.records.write().push(NotificationRecord {
            user_id,
            kind: kind.to_string(),
            data,
        });
        Box::pin(async { Ok(()) })
    }
}

/// A published broadcast message.
#[derive(Debug, Clone)]
pub struct BroadcastMessage {
    /// Channel the payload was published on.
    pub channel: String,
    /// The published payload.
    pub payload: Value,
}

/// In-memory broadcaster that records published messages.
#[derive(Default)]
pub struct MemoryBroadcaster {
    messages: RwLock<Vec<BroadcastMessage>>,
}

impl MemoryBroadcaster {
    /// Creates an empty broadcaster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages published so far.
    #[must_use]
    pub fn messages(&self) -> Vec<BroadcastMessage> {
        self.messages.read().clone()
    }
}

impl Broadcaster for MemoryBroadcaster {
    fn publish(&self, channel: &str, payload: Value) -> BoxFuture<'_, Result<()>> {
        self.messages.write().push(BroadcastMessage {
            channel: channel.to_string(),
            payload,
        });
        Box::pin(async { Ok(()) })
    }
}

/// Mailer that logs sends and keeps them in memory.
///
/// Can be told to fail, which tests use to drive the fallback path.
#[derive(Default)]
pub struct MemoryMailer {
    sent: RwLock<Vec<(RenderedMail, Recipient)>>,
    fail_with: RwLock<Option<String>>,
}

impl MemoryMailer {
    /// Creates a mailer that accepts every send.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent send fail with the given reason.
    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.fail_with.write() = Some(reason.into());
    }

    /// All mails accepted so far.
    #[must_use]
    pub fn sent(&self) -> Vec<(RenderedMail, Recipient)> {
        self.sent.read().clone()
    }
}

impl Mailer for MemoryMailer {
    fn send(&self, mail: &RenderedMail, recipient: &Recipient) -> BoxFuture<'_, Result<()>> {
        if let Some(reason) = self.fail_with.read().clone() {
            return Box::pin(async move { Err(NotifyError::Send { reason }) });
        }
        info!(
            to = %recipient.email,
            subject = %mail.subject,
            template = %mail.template_id,
            "mail sent"
        );
        self.sent.write().push((mail.clone(), recipient.clone()));
        Box::pin(async { Ok(()) })
    }
}

/// In-memory template store with `{key}` placeholder substitution.
///
/// Placeholders are replaced from the top-level string fields of the
/// render data; unknown placeholders are left as-is.
#[derive(Default)]
pub struct MemoryTemplateStore {
    templates: RwLock<HashMap<String, String>>,
}

impl MemoryTemplateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-loaded with the default alert template.
    #[must_use]
    pub fn with_defaults() -> Self {
        let store = Self::new();
        store.insert(
            "alerts.default",
            "{title}\n\n{description}\n\nSeverity: {severity}",
        );
        store
    }

    /// Registers a template body under an id.
    pub fn insert(&self, id: impl Into<String>, body: impl Into<String>) {
        self.templates.write().insert(id.into(), body.into());
    }
}

impl TemplateStore for MemoryTemplateStore {
    fn exists(&self, id: &str) -> bool {
        self.templates.read().contains_key(id)
    }

    fn render(&self, id: &str, data: &Value) -> Result<String> {
        let templates = self.templates.read();
        let body = templates.get(id).ok_or_else(|| NotifyError::TemplateMissing {
            id: id.to_string(),
        })?;

        let mut rendered = body.clone();
        if let Value::Object(fields) = data {
            for (key, value) in fields {
                let placeholder = format!("{{{key}}}");
                if let Some(text) = value.as_str() {
                    rendered = rendered.replace(&placeholder, text);
                }
            }
        }
        Ok(rendered)
    }
}
