//! The closed catalog of administrative alert events.
//!
//! Every operationally significant occurrence the dashboard can raise is a
//! variant of [`AlertKind`]. Category and severity are fixed at the type
//! level; title, description and action URL are pure functions of the
//! variant's own payload. Constructors never fail — optional details default
//! to `None` instead of erroring.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AlertError, Result};
use crate::types::{Category, Severity, UserRef};

/// A concrete alert trigger with its typed payload.
///
/// The payload stays available for programmatic inspection (for example a
/// listener checking [`AlertKind::FailedLogin`]'s `suspicious` flag) while
/// [`AlertEvent::context`] carries the same data as an open map for
/// renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlertKind {
    /// Repeated failed login attempts against an account.
    FailedLogin {
        /// Account email the attempts targeted.
        email: String,
        /// Source IP address.
        ip: String,
        /// Client user agent, when known.
        user_agent: Option<String>,
        /// Consecutive failed attempts observed.
        attempts: u32,
        /// Whether the pattern looks like a credential-stuffing run.
        suspicious: bool,
        /// Geo-resolved location, when known.
        location: Option<String>,
    },

    /// An authenticated user reached a resource they are not allowed to.
    UnauthorizedAccess {
        /// Email of the acting user.
        user_email: String,
        /// Resource that was reached.
        resource: String,
        /// Action that was denied.
        action: String,
        /// Source IP address.
        ip: String,
    },

    /// An upload was rejected by content validation.
    SuspiciousUpload {
        /// Original file name.
        file_name: String,
        /// Declared MIME type.
        mime_type: String,
        /// Why validation rejected the file.
        reason: String,
        /// Source IP address.
        ip: String,
    },

    /// A background job exhausted its retries.
    JobFailure {
        /// Failing job name.
        job_name: String,
        /// Final error message.
        error: String,
        /// Queue lane the job ran on.
        queue: String,
        /// Attempts consumed before giving up.
        attempts: u32,
    },

    /// Disk usage crossed the configured threshold.
    StorageWarning {
        /// Disk or volume identifier.
        disk: String,
        /// Current usage percentage.
        used_percent: u8,
        /// Threshold that was crossed.
        threshold_percent: u8,
    },

    /// A user deleted a large batch of records in one action.
    BulkDeletion {
        /// Model the records belong to.
        model: String,
        /// Number of records removed.
        count: u64,
        /// Email of the acting user.
        user_email: String,
    },

    /// A user changed their password.
    PasswordChanged {
        /// Email of the account.
        user_email: String,
        /// Source IP address, when known.
        ip: Option<String>,
    },

    /// A sale or expense above the review threshold was recorded.
    LargeTransaction {
        /// Transaction kind ("sale" or "expense").
        kind: String,
        /// Amount in the account currency.
        amount: f64,
        /// ISO currency code.
        currency: String,
        /// Record reference, when available.
        reference: Option<String>,
    },

    /// A business goal closed its period below target.
    GoalMissed {
        /// Goal name.
        goal_name: String,
        /// Target value for the period.
        target: f64,
        /// Actual value reached.
        actual: f64,
        /// Period label, e.g. "2026-Q3".
        period: String,
    },
}

impl AlertKind {
    /// Stable identifier for the concrete event type.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::FailedLogin { .. } => "failed_login",
            Self::UnauthorizedAccess { .. } => "unauthorized_access",
            Self::SuspiciousUpload { .. } => "suspicious_upload",
            Self::JobFailure { .. } => "job_failure",
            Self::StorageWarning { .. } => "storage_warning",
            Self::BulkDeletion { .. } => "bulk_deletion",
            Self::PasswordChanged { .. } => "password_changed",
            Self::LargeTransaction { .. } => "large_transaction",
            Self::GoalMissed { .. } => "goal_missed",
        }
    }

    /// Routing category, fixed per variant.
    #[must_use]
    pub const fn category(&self) -> Category {
        match self {
            Self::FailedLogin { .. }
            | Self::UnauthorizedAccess { .. }
            | Self::SuspiciousUpload { .. } => Category::Security,
            Self::JobFailure { .. } | Self::StorageWarning { .. } => Category::System,
            Self::BulkDeletion { .. } | Self::PasswordChanged { .. } => Category::UserAction,
            Self::LargeTransaction { .. } | Self::GoalMissed { .. } => Category::Business,
        }
    }

    /// Severity, fixed per variant.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::UnauthorizedAccess { .. } | Self::JobFailure { .. } => Severity::Critical,
            Self::FailedLogin { .. }
            | Self::SuspiciousUpload { .. }
            | Self::LargeTransaction { .. } => Severity::High,
            Self::StorageWarning { .. } | Self::BulkDeletion { .. } => Severity::Medium,
            Self::PasswordChanged { .. } | Self::GoalMissed { .. } => Severity::Low,
        }
    }

    /// Short label for notification lists and mail subjects.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::FailedLogin { .. } => "Failed login attempts",
            Self::UnauthorizedAccess { .. } => "Unauthorized access",
            Self::SuspiciousUpload { .. } => "Suspicious file upload",
            Self::JobFailure { .. } => "Background job failed",
            Self::StorageWarning { .. } => "Storage threshold exceeded",
            Self::BulkDeletion { .. } => "Bulk record deletion",
            Self::PasswordChanged { .. } => "Password changed",
            Self::LargeTransaction { .. } => "Large transaction recorded",
            Self::GoalMissed { .. } => "Goal missed",
        }
    }

    /// One-sentence description built from the typed payload.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::FailedLogin {
                email,
                ip,
                attempts,
                suspicious,
                ..
            } => {
                let qualifier = if *suspicious { "suspicious " } else { "" };
                format!("{attempts} {qualifier}failed login attempts for {email} from {ip}")
            }
            Self::UnauthorizedAccess {
                user_email,
                resource,
                action,
                ip,
            } => format!("{user_email} was denied '{action}' on {resource} from {ip}"),
            Self::SuspiciousUpload {
                file_name, reason, ..
            } => format!("upload of '{file_name}' was rejected: {reason}"),
            Self::JobFailure {
                job_name,
                error,
                attempts,
                ..
            } => format!("job '{job_name}' failed after {attempts} attempt(s): {error}"),
            Self::StorageWarning {
                disk,
                used_percent,
                threshold_percent,
            } => format!("disk '{disk}' is {used_percent}% full (threshold {threshold_percent}%)"),
            Self::BulkDeletion {
                model,
                count,
                user_email,
            } => format!("{user_email} deleted {count} {model} records in one action"),
            Self::PasswordChanged { user_email, .. } => {
                format!("password changed for {user_email}")
            }
            Self::LargeTransaction {
                kind,
                amount,
                currency,
                ..
            } => format!("a {kind} of {amount:.2} {currency} was recorded"),
            Self::GoalMissed {
                goal_name,
                target,
                actual,
                period,
            } => format!("goal '{goal_name}' closed {period} at {actual:.2} of {target:.2}"),
        }
    }

    /// Deep link to the relevant resource, when one exists.
    #[must_use]
    pub fn action_url(&self) -> Option<String> {
        match self {
            Self::FailedLogin { email, .. } | Self::PasswordChanged {
                user_email: email, ..
            } => Some(format!("/admin/users?email={email}")),
            Self::UnauthorizedAccess { user_email, .. } => {
                Some(format!("/admin/users?email={user_email}"))
            }
            Self::JobFailure { job_name, .. } => Some(format!("/admin/jobs?name={job_name}")),
            Self::LargeTransaction {
                kind,
                reference: Some(reference),
                ..
            } => Some(format!("/admin/{kind}s/{reference}")),
            Self::GoalMissed { goal_name, .. } => Some(format!("/admin/goals?name={goal_name}")),
            Self::SuspiciousUpload { .. }
            | Self::StorageWarning { .. }
            | Self::BulkDeletion { .. }
            | Self::LargeTransaction { reference: None, .. } => None,
        }
    }

    /// Flattens the typed payload into the generic context map consumed by
    /// renderers and persisted with notifications.
    #[must_use]
    pub fn context(&self) -> HashMap<String, Value> {
        let mut context = HashMap::new();
        match self {
            Self::FailedLogin {
                email,
                ip,
                user_agent,
                attempts,
                suspicious,
                location,
            } => {
                context.insert("email".to_string(), json!(email));
                context.insert("ip".to_string(), json!(ip));
                context.insert("user_agent".to_string(), json!(user_agent));
                context.insert("attempts".to_string(), json!(attempts));
                context.insert("suspicious".to_string(), json!(suspicious));
                context.insert("location".to_string(), json!(location));
            }
            Self::UnauthorizedAccess {
                user_email,
                resource,
                action,
                ip,
            } => {
                context.insert("user_email".to_string(), json!(user_email));
                context.insert("resource".to_string(), json!(resource));
                context.insert("action".to_string(), json!(action));
                context.insert("ip".to_string(), json!(ip));
            }
            Self::SuspiciousUpload {
                file_name,
                mime_type,
                reason,
                ip,
            } => {
                context.insert("file_name".to_string(), json!(file_name));
                context.insert("mime_type".to_string(), json!(mime_type));
                context.insert("reason".to_string(), json!(reason));
                context.insert("ip".to_string(), json!(ip));
            }
            Self::JobFailure {
                job_name,
                error,
                queue,
                attempts,
            } => {
                context.insert("job_name".to_string(), json!(job_name));
                context.insert("error".to_string(), json!(error));
                context.insert("queue".to_string(), json!(queue));
                context.insert("attempts".to_string(), json!(attempts));
            }
            Self::StorageWarning {
                disk,
                used_percent,
                threshold_percent,
            } => {
                context.insert("disk".to_string(), json!(disk));
                context.insert("used_percent".to_string(), json!(used_percent));
                context.insert("threshold_percent".to_string(), json!(threshold_percent));
            }
            Self::BulkDeletion {
                model,
                count,
                user_email,
            } => {
                context.insert("model".to_string(), json!(model));
                context.insert("count".to_string(), json!(count));
                context.insert("user_email".to_string(), json!(user_email));
            }
            Self::PasswordChanged { user_email, ip } => {
                context.insert("user_email".to_string(), json!(user_email));
                context.insert("ip".to_string(), json!(ip));
            }
            Self::LargeTransaction {
                kind,
                amount,
                currency,
                reference,
            } => {
                context.insert("kind".to_string(), json!(kind));
                context.insert("amount".to_string(), json!(amount));
                context.insert("currency".to_string(), json!(currency));
                context.insert("reference".to_string(), json!(reference));
            }
            Self::GoalMissed {
                goal_name,
                target,
                actual,
                period,
            } => {
                context.insert("goal_name".to_string(), json!(goal_name));
                context.insert("target".to_string(), json!(target));
                context.insert("actual".to_string(), json!(actual));
                context.insert("period".to_string(), json!(period));
            }
        }
        context
    }
}

/// An administrative alert event, immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    /// Unique event identifier.
    pub id: Uuid,
    /// The concrete trigger and its typed payload.
    pub kind: AlertKind,
    /// When the event occurred, set at construction.
    pub occurred_at: DateTime<Utc>,
    /// Acting user, absent for system-triggered events.
    pub initiated_by: Option<UserRef>,
    /// Free-form payload consumed opaquely by renderers.
    pub context: HashMap<String, Value>,
}

impl AlertEvent {
    /// Wraps a catalog variant into an event, packing its payload into the
    /// generic context map.
    #[must_use]
    pub fn new(kind: AlertKind) -> Self {
        let context = kind.context();
        Self {
            id: Uuid::new_v4(),
            kind,
            occurred_at: Utc::now(),
            initiated_by: None,
            context,
        }
    }

    /// Attaches the acting user.
    #[must_use]
    pub fn with_initiator(mut self, user: UserRef) -> Self {
        self.initiated_by = Some(user);
        self
    }

    /// Adds an extra context entry on top of the packed payload.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    /// Stable identifier for the concrete event type.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    /// Routing category.
    #[must_use]
    pub const fn category(&self) -> Category {
        self.kind.category()
    }

    /// Severity.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.kind.severity()
    }

    /// Short label.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        self.kind.title()
    }

    /// One-sentence description of what happened.
    #[must_use]
    pub fn description(&self) -> String {
        self.kind.description()
    }

    /// Deep link to the relevant resource, when one exists.
    #[must_use]
    pub fn action_url(&self) -> Option<String> {
        self.kind.action_url()
    }

    /// Serializes the event to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(AlertError::from)
    }

    // ---- convenience constructors, one per catalog variant ----

    /// Failed login attempts against an account.
    #[must_use]
    pub fn failed_login(
        email: impl Into<String>,
        ip: impl Into<String>,
        user_agent: Option<String>,
        attempts: u32,
        suspicious: bool,
        location: Option<String>,
    ) -> Self {
        Self::new(AlertKind::FailedLogin {
            email: email.into(),
            ip: ip.into(),
            user_agent,
            attempts,
            suspicious,
            location,
        })
    }

    /// Denied access to a protected resource.
    #[must_use]
    pub fn unauthorized_access(
        user_email: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
        ip: impl Into<String>,
    ) -> Self {
        Self::new(AlertKind::UnauthorizedAccess {
            user_email: user_email.into(),
            resource: resource.into(),
            action: action.into(),
            ip: ip.into(),
        })
    }

    /// Upload rejected by content validation.
    #[must_use]
    pub fn suspicious_upload(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        reason: impl Into<String>,
        ip: impl Into<String>,
    ) -> Self {
        Self::new(AlertKind::SuspiciousUpload {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            reason: reason.into(),
            ip: ip.into(),
        })
    }

    /// Background job that exhausted its retries.
    #[must_use]
    pub fn job_failure(
        job_name: impl Into<String>,
        error: impl Into<String>,
        queue: impl Into<String>,
        attempts: u32,
    ) -> Self {
        Self::new(AlertKind::JobFailure {
            job_name: job_name.into(),
            error: error.into(),
            queue: queue.into(),
            attempts,
        })
    }

    /// Disk usage crossed the configured threshold.
    #[must_use]
    pub fn storage_warning(
        disk: impl Into<String>,
        used_percent: u8,
        threshold_percent: u8,
    ) -> Self {
        Self::new(AlertKind::StorageWarning {
            disk: disk.into(),
            used_percent,
            threshold_percent,
        })
    }

    /// Large batch of records deleted in one action.
    #[must_use]
    pub fn bulk_deletion(
        model: impl Into<String>,
        count: u64,
        user_email: impl Into<String>,
    ) -> Self {
        Self::new(AlertKind::BulkDeletion {
            model: model.into(),
            count,
            user_email: user_email.into(),
        })
    }

    /// Password change on an account.
    #[must_use]
    pub fn password_changed(user_email: impl Into<String>, ip: Option<String>) -> Self {
        Self::new(AlertKind::PasswordChanged {
            user_email: user_email.into(),
            ip,
        })
    }

    /// Sale or expense above the review threshold.
    #[must_use]
    pub fn large_transaction(
        kind: impl Into<String>,
        amount: f64,
        currency: impl Into<String>,
        reference: Option<String>,
    ) -> Self {
        Self::new(AlertKind::LargeTransaction {
            kind: kind.into(),
            amount,
            currency: currency.into(),
            reference,
        })
    }

    /// Business goal closed below target.
    #[must_use]
    pub fn goal_missed(
        goal_name: impl Into<String>,
        target: f64,
        actual: f64,
        period: impl Into<String>,
    ) -> Self {
        Self::new(AlertKind::GoalMissed {
            goal_name: goal_name.into(),
            target,
            actual,
            period: period.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed_login() -> AlertEvent {
        AlertEvent::failed_login(
            "a@b.com",
            "1.2.3.4",
            Some("curl/8.0".to_string()),
            6,
            true,
            None,
        )
    }

    mod classification_tests {
        use super::*;

        #[test]
        fn categories_fixed_per_variant() {
            assert_eq!(failed_login().category(), Category::Security);
            assert_eq!(
                AlertEvent::job_failure("backup", "disk full", "default", 3).category(),
                Category::System
            );
            assert_eq!(
                AlertEvent::bulk_deletion("sales", 120, "x@y.com").category(),
                Category::UserAction
            );
            assert_eq!(
                AlertEvent::large_transaction("sale", 25_000.0, "EUR", None).category(),
                Category::Business
            );
        }

        #[test]
        fn severities_fixed_per_variant() {
            assert_eq!(failed_login().severity(), Severity::High);
            assert_eq!(
                AlertEvent::unauthorized_access("x@y.com", "reports", "export", "1.1.1.1")
                    .severity(),
                Severity::Critical
            );
            assert_eq!(
                AlertEvent::storage_warning("/var/data", 92, 90).severity(),
                Severity::Medium
            );
            assert_eq!(
                AlertEvent::password_changed("x@y.com", None).severity(),
                Severity::Low
            );
            assert_eq!(
                AlertEvent::goal_missed("Q3 revenue", 100_000.0, 82_500.0, "2026-Q3").severity(),
                Severity::Low
            );
        }

        #[test]
        fn event_type_is_stable() {
            assert_eq!(failed_login().event_type(), "failed_login");
            assert_eq!(
                AlertEvent::suspicious_upload("x.php", "text/php", "executable", "1.1.1.1")
                    .event_type(),
                "suspicious_upload"
            );
        }
    }

    mod derived_field_tests {
        use super::*;

        #[test]
        fn description_includes_payload() {
            let description = failed_login().description();
            assert!(description.contains("a@b.com"));
            assert!(description.contains("1.2.3.4"));
            assert!(description.contains('6'));
            assert!(description.contains("suspicious"));
        }

        #[test]
        fn description_without_suspicious_flag() {
            let event = AlertEvent::failed_login("a@b.com", "1.2.3.4", None, 2, false, None);
            assert!(!event.description().contains("suspicious"));
        }

        #[test]
        fn action_url_deep_links() {
            assert_eq!(
                failed_login().action_url(),
                Some("/admin/users?email=a@b.com".to_string())
            );
            assert_eq!(
                AlertEvent::large_transaction("sale", 1.0, "EUR", Some("s-17".to_string()))
                    .action_url(),
                Some("/admin/sales/s-17".to_string())
            );
        }

        #[test]
        fn action_url_absent_when_no_resource() {
            assert!(AlertEvent::storage_warning("/", 95, 90).action_url().is_none());
            assert!(
                AlertEvent::large_transaction("sale", 1.0, "EUR", None)
                    .action_url()
                    .is_none()
            );
        }
    }

    mod construction_tests {
        use super::*;
        use crate::types::Role;
        use crate::types::User;

        #[test]
        fn context_packs_typed_fields() {
            let event = failed_login();
            assert_eq!(event.context.get("email"), Some(&json!("a@b.com")));
            assert_eq!(event.context.get("ip"), Some(&json!("1.2.3.4")));
            assert_eq!(event.context.get("attempts"), Some(&json!(6)));
            assert_eq!(event.context.get("suspicious"), Some(&json!(true)));
            // Missing optional detail defaults to null, not an error
            assert_eq!(event.context.get("location"), Some(&Value::Null));
        }

        #[test]
        fn initiator_defaults_to_none() {
            assert!(failed_login().initiated_by.is_none());
        }

        #[test]
        fn with_initiator_attaches_user() {
            let user = User::new("Ada", "ada@example.com", Role::Member);
            let event = AlertEvent::password_changed("ada@example.com", None)
                .with_initiator(user.as_ref());
            assert_eq!(event.initiated_by.map(|u| u.email), Some("ada@example.com".to_string()));
        }

        #[test]
        fn with_context_adds_entry() {
            let event = failed_login().with_context("request_id", json!("req-1"));
            assert_eq!(event.context.get("request_id"), Some(&json!("req-1")));
        }

        #[test]
        fn occurred_at_is_recent() {
            let event = failed_login();
            let age = Utc::now().signed_duration_since(event.occurred_at);
            assert!(age.num_seconds() < 1);
        }

        #[test]
        fn serialization_roundtrip() {
            let event = failed_login();
            let json = event.to_json();
            assert!(json.is_ok());
            let parsed: serde_json::Result<AlertEvent> = serde_json::from_str(&json.unwrap());
            assert!(parsed.is_ok());
            assert_eq!(parsed.unwrap(), event);
        }
    }
}
