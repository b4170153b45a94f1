//! Core types for the administrative alerting system.
//!
//! This module provides the fundamental types used throughout the
//! alerting crates:
//! - [`Severity`]: urgency of an alert, driving retry, queueing and dedup policy
//! - [`Category`]: routing group of an alert
//! - [`UserRef`] / [`User`] / [`Role`]: actor and recipient references

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::Level;
use uuid::Uuid;

/// The severity of an administrative alert.
///
/// Severity is fixed per concrete event type and is never set ad hoc at
/// dispatch time. It drives queue priority, retry policy, per-attempt
/// timeout, rate-limit window and email eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Heavily throttled, single delivery attempt.
    Low = 0,
    /// Routine operational signal.
    Medium = 1,
    /// Needs prompt attention; delivered by email as well.
    High = 2,
    /// Requires immediate attention; re-fires quickly if the condition persists.
    Critical = 3,
}

impl Severity {
    /// Returns the severity as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Maximum number of delivery attempts for this severity.
    #[must_use]
    pub const fn max_tries(&self) -> u32 {
        match self {
            Self::Critical => 5,
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }

    /// Explicit per-attempt backoff schedule.
    ///
    /// The delay at index `n` is applied after attempt `n + 1` fails. The
    /// schedule is a fixed list, not an exponential formula, so the exact
    /// pacing is auditable per severity.
    #[must_use]
    pub const fn backoff(&self) -> &'static [Duration] {
        const CRITICAL: &[Duration] = &[
            Duration::from_secs(15),
            Duration::from_secs(30),
            Duration::from_secs(60),
            Duration::from_secs(120),
            Duration::from_secs(300),
        ];
        const HIGH: &[Duration] = &[
            Duration::from_secs(30),
            Duration::from_secs(60),
            Duration::from_secs(120),
        ];
        const MEDIUM: &[Duration] = &[Duration::from_secs(60), Duration::from_secs(120)];
        const LOW: &[Duration] = &[Duration::from_secs(60)];

        match self {
            Self::Critical => CRITICAL,
            Self::High => HIGH,
            Self::Medium => MEDIUM,
            Self::Low => LOW,
        }
    }

    /// Returns the backoff delay to apply after the given failed attempt
    /// (1-based). Attempts past the end of the schedule reuse the last delay.
    #[must_use]
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let schedule = self.backoff();
        let index = (attempt.max(1) as usize - 1).min(schedule.len() - 1);
        schedule[index]
    }

    /// Per-attempt processing timeout. Tighter for urgent severities so a
    /// stuck attempt does not hold a worker slot.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        match self {
            Self::Critical => Duration::from_secs(60),
            Self::High => Duration::from_secs(90),
            Self::Medium => Duration::from_secs(120),
            Self::Low => Duration::from_secs(180),
        }
    }

    /// Deduplication window. Scales inversely with urgency: critical alerts
    /// re-fire quickly if the underlying condition persists, low alerts are
    /// heavily throttled.
    #[must_use]
    pub const fn rate_limit_ttl(&self) -> Duration {
        match self {
            Self::Critical => Duration::from_secs(60),
            Self::High => Duration::from_secs(300),
            Self::Medium => Duration::from_secs(900),
            Self::Low => Duration::from_secs(3600),
        }
    }

    /// Whether alerts of this severity are also delivered by email.
    #[must_use]
    pub const fn sends_email(&self) -> bool {
        matches!(self, Self::Critical | Self::High)
    }

    /// Tracing level at which activity for this severity is logged.
    #[must_use]
    pub const fn tracing_level(&self) -> Level {
        match self {
            Self::Critical => Level::ERROR,
            Self::High => Level::WARN,
            Self::Medium => Level::INFO,
            Self::Low => Level::DEBUG,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The routing category of an administrative alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Authentication, authorization and abuse signals.
    Security,
    /// Infrastructure and background-job health.
    System,
    /// Notable actions performed by regular users.
    UserAction,
    /// Sales, expenses and goal signals.
    Business,
}

impl Category {
    /// Returns the category as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Security => "security",
            Self::System => "system",
            Self::UserAction => "user_action",
            Self::Business => "business",
        }
    }

    /// Human-readable category label used in mail subjects.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Security => "Security",
            Self::System => "System",
            Self::UserAction => "User Action",
            Self::Business => "Business",
        }
    }

    /// All categories, in routing order.
    #[must_use]
    pub const fn all() -> [Self; 4] {
        [Self::Security, Self::System, Self::UserAction, Self::Business]
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Role of a dashboard user, used to build recipient pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular dashboard user.
    Member,
    /// Receives fallback notifications.
    Admin,
    /// Broader escalation audience.
    SuperAdmin,
}

impl Role {
    /// Returns the role as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lightweight reference to the user that initiated an event.
///
/// System-triggered events carry no initiator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    /// Unique user identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
}

impl UserRef {
    /// Creates a new user reference.
    #[must_use]
    pub fn new(id: Uuid, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
        }
    }
}

/// A dashboard user, as surfaced by the user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Directory role.
    pub role: Role,
    /// Whether the user prefers plain-text mail.
    #[serde(default)]
    pub prefers_plain_text: bool,
}

impl User {
    /// Creates a new user with a fresh id.
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            role,
            prefers_plain_text: false,
        }
    }

    /// Sets the plain-text mail preference.
    #[must_use]
    pub const fn with_plain_text(mut self, prefers: bool) -> Self {
        self.prefers_plain_text = prefers;
        self
    }

    /// Returns a [`UserRef`] for this user.
    #[must_use]
    pub fn as_ref(&self) -> UserRef {
        UserRef {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}
