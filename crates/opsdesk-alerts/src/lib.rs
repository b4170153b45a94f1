//! Administrative alert event model and catalog for Opsdesk.
//!
//! `opsdesk-alerts` defines the typed catalog of operational, security and
//! business events the dashboard can raise, along with the policy tables
//! derived from severity and the context sanitizer applied before any
//! rendering step.
//!
//! # Features
//!
//! - **Closed event catalog**: every trigger is a variant of [`AlertKind`]
//!   with a typed payload; category and severity are fixed at the type level
//! - **Severity policy tables**: retry counts, backoff schedules, timeouts
//!   and dedup windows are total functions of [`Severity`]
//! - **Derived routing metadata**: title, description and action URL are
//!   pure functions of the event's own state
//! - **Context sanitization**: sensitive keys redacted, long values
//!   truncated before anything reaches a template or stored notification
//!
//! # Example
//!
//! ```rust
//! use opsdesk_alerts::{AlertEvent, Category, Severity};
//!
//! let event = AlertEvent::failed_login(
//!     "a@b.com",
//!     "1.2.3.4",
//!     Some("Mozilla/5.0".to_string()),
//!     6,
//!     true,
//!     None,
//! );
//!
//! assert_eq!(event.category(), Category::Security);
//! assert_eq!(event.severity(), Severity::High);
//! assert_eq!(event.severity().max_tries(), 3);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod catalog;
pub mod error;
pub mod sanitize;
pub mod types;

// Re-export main types at crate root
pub use catalog::{AlertEvent, AlertKind};
pub use error::{AlertError, Result};
pub use sanitize::{sanitize_context, MAX_STRING_LEN, REDACTED, TRUNCATION_MARKER};
pub use types::{Category, Role, Severity, User, UserRef};
