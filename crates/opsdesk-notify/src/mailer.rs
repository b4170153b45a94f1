//! Alert mail rendering and delivery.
//!
//! Rendering walks a template chain from most to least specific and uses
//! the first template that exists, so deployments can override mail for a
//! single event type without touching the rest.

use std::sync::Arc;

use serde_json::json;
use tracing::{error, warn};
use uuid::Uuid;

use opsdesk_alerts::{AlertEvent, Severity, User};

use crate::error::Result;
use crate::interfaces::{Mailer, NotificationStore, TemplateStore};

/// The template every deployment is expected to ship.
pub const DEFAULT_TEMPLATE: &str = "alerts.default";

/// Who a mail is addressed to.
#[derive(Debug, Clone)]
pub struct Recipient {
    /// Dashboard user id, used for fallback notification records.
    pub user_id: Uuid,
    /// Display name.
    pub name: String,
    /// Address the mail goes to.
    pub email: String,
    /// Whether this recipient opted into plain-text mail.
    pub prefers_plain_text: bool,
}

impl From<&User> for Recipient {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            prefers_plain_text: user.prefers_plain_text,
        }
    }
}

/// A fully rendered mail, ready for a [`Mailer`].
#[derive(Debug, Clone)]
pub struct RenderedMail {
    /// Subject line.
    pub subject: String,
    /// Extra headers, notably mail client priority hints.
    pub headers: Vec<(String, String)>,
    /// Rendered body.
    pub body: String,
    /// Which template produced the body.
    pub template_id: String,
}

/// Renders alert events into mail using a [`TemplateStore`].
pub struct AlertMailRenderer {
    templates: Arc<dyn TemplateStore>,
}

impl AlertMailRenderer {
    /// Creates a renderer over the given template store.
    pub fn new(templates: Arc<dyn TemplateStore>) -> Self {
        Self { templates }
    }

    /// Builds the subject line: `[SEVERITY] Category Alert: Title`.
    #[must_use]
    pub fn subject(event: &AlertEvent) -> String {
        format!(
            "[{}] {} Alert: {}",
            event.severity().as_str().to_uppercase(),
            event.category().display_name(),
            event.title()
        )
    }

    /// Priority headers for the event's severity.
    ///
    /// Critical alerts are flagged urgent so mail clients surface them.
    #[must_use]
    pub fn priority_headers(severity: Severity) -> Vec<(String, String)> {
        if severity == Severity::Critical {
            vec![
                ("X-Priority".to_string(), "1".to_string()),
                ("X-MSMail-Priority".to_string(), "High".to_string()),
            ]
        } else {
            vec![
                ("X-Priority".to_string(), "3".to_string()),
                ("X-MSMail-Priority".to_string(), "Normal".to_string()),
            ]
        }
    }

    /// Picks the template for an event and recipient.
    ///
    /// Candidates, most specific first: recipient plain-text preference,
    /// critical severity, the event type, the category, then
    /// [`DEFAULT_TEMPLATE`]. The first candidate the store knows wins;
    /// the default is returned even if the store lacks it, so the render
    /// error names the template a deployment is missing.
    #[must_use]
    pub fn select_template(&self, event: &AlertEvent, recipient: &Recipient) -> String {
        let event_template = format!("alerts.events.{}", event.event_type());
        let category_template = format!("alerts.categories.{}", event.category().as_str());

        let mut candidates = Vec::with_capacity(5);
        if recipient.prefers_plain_text {
            candidates.push("alerts.plain".to_string());
        }
        if event.severity() == Severity::Critical {
            candidates.push("alerts.critical".to_string());
        }
        candidates.push(event_template);
        candidates.push(category_template);

        candidates
            .into_iter()
            .find(|id| self.templates.exists(id))
            .unwrap_or_else(|| DEFAULT_TEMPLATE.to_string())
    }

    /// Renders the full mail for an event and recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if the selected template cannot be rendered.
    pub fn render(&self, event: &AlertEvent, recipient: &Recipient) -> Result<RenderedMail> {
        let template_id = self.select_template(event, recipient);
        let data = json!({
            "title": event.title(),
            "description": event.description(),
            "severity": event.severity().as_str(),
            "category": event.category().as_str(),
            "event_type": event.event_type(),
            "recipient_name": recipient.name,
            "action_url": event.action_url(),
            "occurred_at": event.occurred_at.to_rfc3339(),
        });
        let body = self.templates.render(&template_id, &data)?;

        Ok(RenderedMail {
            subject: Self::subject(event),
            headers: Self::priority_headers(event.severity()),
            body,
            template_id,
        })
    }
}

/// Renders and sends alert mail, with a notification-record fallback.
pub struct AlertMailer {
    renderer: AlertMailRenderer,
    mailer: Arc<dyn Mailer>,
    notifications: Arc<dyn NotificationStore>,
}

impl AlertMailer {
    /// Creates the mailer.
    pub fn new(
        templates: Arc<dyn TemplateStore>,
        mailer: Arc<dyn Mailer>,
        notifications: Arc<dyn NotificationStore>,
    ) -> Self {
        Self {
            renderer: AlertMailRenderer::new(templates),
            mailer,
            notifications,
        }
    }

    /// Renders and delivers the event's mail to one recipient.
    ///
    /// A failed send is not propagated: the recipient gets a
    /// `mail_failed` notification record instead, and even that write is
    /// best-effort.
    pub async fn deliver(&self, event: &AlertEvent, recipient: &Recipient) -> Result<()> {
        let mail = self.renderer.render(event, recipient)?;

        if let Err(e) = self.mailer.send(&mail, recipient).await {
            error!(
                to = %recipient.email,
                event_type = %event.event_type(),
                error = %e,
                "alert mail send failed"
            );
            let record = json!({
                "title": event.title(),
                "description": event.description(),
                "severity": event.severity().as_str(),
                "reason": e.to_string(),
            });
            if let Err(store_err) = self
                .notifications
                .create(recipient.user_id, "mail_failed", record)
                .await
            {
                warn!(
                    user = %recipient.user_id,
                    error = %store_err,
                    "could not record mail failure"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::{MemoryMailer, MemoryNotificationStore, MemoryTemplateStore};
    use opsdesk_alerts::AlertKind;

    fn failed_login_event() -> AlertEvent {
        AlertEvent::new(AlertKind::FailedLogin {
            email: "user@example.com".to_string(),
            ip: "203.0.113.9".to_string(),
            user_agent: Some("curl/8.0".to_string()),
            attempts: 6,
            suspicious: true,
            location: Some("Berlin, DE".to_string()),
        })
    }

    fn job_failure_event() -> AlertEvent {
        AlertEvent::new(AlertKind::JobFailure {
            job_name: "invoice-sync".to_string(),
            error: "connection refused".to_string(),
            queue: "default".to_string(),
            attempts: 3,
        })
    }

    fn recipient() -> Recipient {
        Recipient {
            user_id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            prefers_plain_text: false,
        }
    }

    mod subject_tests {
        use super::*;

        #[test]
        fn formats_severity_category_title() {
            let subject = AlertMailRenderer::subject(&failed_login_event());
            assert_eq!(subject, "[HIGH] Security Alert: Failed login attempts");
        }

        #[test]
        fn critical_subject_uses_critical_tag() {
            let subject = AlertMailRenderer::subject(&job_failure_event());
            assert!(subject.starts_with("[CRITICAL] System Alert:"));
        }
    }

    mod priority_tests {
        use super::*;
        use test_case::test_case;

        #[test_case(Severity::Critical, "1", "High" ; "critical is urgent")]
        #[test_case(Severity::High, "3", "Normal" ; "high is normal")]
        #[test_case(Severity::Medium, "3", "Normal" ; "medium is normal")]
        #[test_case(Severity::Low, "3", "Normal" ; "low is normal")]
        fn headers_for_severity(severity: Severity, priority: &str, importance: &str) {
            let headers = AlertMailRenderer::priority_headers(severity);
            assert_eq!(headers[0], ("X-Priority".to_string(), priority.to_string()));
            assert_eq!(
                headers[1],
                ("X-MSMail-Priority".to_string(), importance.to_string())
            );
        }
    }

    mod template_chain_tests {
        use super::*;

        fn renderer_with(ids: &[&str]) -> AlertMailRenderer {
            let store = MemoryTemplateStore::new();
            for id in ids {
                store.insert(*id, "body");
            }
            AlertMailRenderer::new(Arc::new(store))
        }

        #[test]
        fn plain_text_preference_wins() {
            let renderer = renderer_with(&["alerts.plain", "alerts.critical", "alerts.default"]);
            let mut plain = recipient();
            plain.prefers_plain_text = true;

            let id = renderer.select_template(&job_failure_event(), &plain);
            assert_eq!(id, "alerts.plain");
        }

        #[test]
        fn critical_template_beats_event_template() {
            let renderer = renderer_with(&[
                "alerts.critical",
                "alerts.events.job_failure",
                "alerts.default",
            ]);
            let id = renderer.select_template(&job_failure_event(), &recipient());
            assert_eq!(id, "alerts.critical");
        }

        #[test]
        fn event_template_beats_category_template() {
            let renderer = renderer_with(&[
                "alerts.events.failed_login",
                "alerts.categories.security",
                "alerts.default",
            ]);
            let id = renderer.select_template(&failed_login_event(), &recipient());
            assert_eq!(id, "alerts.events.failed_login");
        }

        #[test]
        fn category_template_beats_default() {
            let renderer = renderer_with(&["alerts.categories.security", "alerts.default"]);
            let id = renderer.select_template(&failed_login_event(), &recipient());
            assert_eq!(id, "alerts.categories.security");
        }

        #[test]
        fn falls_back_to_default() {
            let renderer = renderer_with(&["alerts.default"]);
            let id = renderer.select_template(&failed_login_event(), &recipient());
            assert_eq!(id, DEFAULT_TEMPLATE);
        }

        #[test]
        fn default_named_even_when_missing() {
            let renderer = renderer_with(&[]);
            let id = renderer.select_template(&failed_login_event(), &recipient());
            assert_eq!(id, DEFAULT_TEMPLATE);
        }
    }

    mod render_tests {
        use super::*;

        #[test]
        fn renders_body_with_event_fields() {
            let store = MemoryTemplateStore::new();
            store.insert("alerts.default", "{title} / {severity} for {recipient_name}");
            let renderer = AlertMailRenderer::new(Arc::new(store));

            let mail = renderer.render(&failed_login_event(), &recipient()).unwrap();
            assert_eq!(mail.body, "Failed login attempts / high for Ada");
            assert_eq!(mail.template_id, "alerts.default");
        }

        #[test]
        fn missing_default_template_is_an_error() {
            let renderer = AlertMailRenderer::new(Arc::new(MemoryTemplateStore::new()));
            assert!(renderer.render(&failed_login_event(), &recipient()).is_err());
        }
    }

    mod deliver_tests {
        use super::*;

        fn mailer_setup() -> (Arc<MemoryMailer>, Arc<MemoryNotificationStore>, AlertMailer) {
            let transport = Arc::new(MemoryMailer::new());
            let notifications = Arc::new(MemoryNotificationStore::new());
            let mailer = AlertMailer::new(
                Arc::new(MemoryTemplateStore::with_defaults()),
                Arc::clone(&transport) as Arc<dyn Mailer>,
                Arc::clone(&notifications) as Arc<dyn NotificationStore>,
            );
            (transport, notifications, mailer)
        }

        #[tokio::test]
        async fn delivers_rendered_mail() {
            let (transport, notifications, mailer) = mailer_setup();
            mailer.deliver(&failed_login_event(), &recipient()).await.unwrap();

            let sent = transport.sent();
            assert_eq!(sent.len(), 1);
            assert_eq!(
                sent[0].0.subject,
                "[HIGH] Security Alert: Failed login attempts"
            );
            assert!(notifications.records().is_empty());
        }

        #[tokio::test]
        async fn send_failure_records_fallback_notification() {
            let (transport, notifications, mailer) = mailer_setup();
            transport.fail_with("smtp down");

            let to = recipient();
            mailer.deliver(&failed_login_event(), &to).await.unwrap();

            let records = notifications.records_of_kind("mail_failed");
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].user_id, to.user_id);
            assert_eq!(records[0].data["reason"], "mail send failed: smtp down");
        }
    }
}
