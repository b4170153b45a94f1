//! Context sanitization applied before any render or persist step.
//!
//! The raw context an event carries may include credentials or oversized
//! payloads (stack traces, request bodies). Every value that reaches a
//! template, broadcast or stored notification goes through
//! [`sanitize_context`] first: sensitive keys are redacted and long strings
//! are truncated.

use std::collections::HashMap;

use serde_json::Value;

/// Replacement for values under sensitive keys.
pub const REDACTED: &str = "[REDACTED]";

/// Maximum retained length (in characters) of any string value.
pub const MAX_STRING_LEN: usize = 500;

/// Suffix appended to truncated strings.
pub const TRUNCATION_MARKER: &str = "... [truncated]";

/// Denylist of sensitive key terms, matched case-insensitively as
/// substrings of the key.
const SENSITIVE_TERMS: &[&str] = &[
    "password",
    "token",
    "secret",
    "key",
    "credit_card",
    "ssn",
    "bank_account",
    "authorization",
    "cvv",
];

/// Returns true if the key matches the sensitive-term denylist.
#[must_use]
pub fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_lowercase();
    SENSITIVE_TERMS.iter().any(|term| key.contains(term))
}

/// Produces a sanitized copy of a context map.
///
/// Walks the map recursively: any key matching the denylist has its value
/// replaced with [`REDACTED`] (whatever its shape), and any string longer
/// than [`MAX_STRING_LEN`] characters is truncated with a marker suffix.
/// The original map is left untouched.
#[must_use]
pub fn sanitize_context(context: &HashMap<String, Value>) -> HashMap<String, Value> {
    context
        .iter()
        .map(|(key, value)| {
            if is_sensitive_key(key) {
                (key.clone(), Value::String(REDACTED.to_string()))
            } else {
                (key.clone(), sanitize_value(value))
            }
        })
        .collect()
}

fn sanitize_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(truncate(s)),
        Value::Array(items) => Value::Array(items.iter().map(sanitize_value).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| {
                    if is_sensitive_key(key) {
                        (key.clone(), Value::String(REDACTED.to_string()))
                    } else {
                        (key.clone(), sanitize_value(value))
                    }
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

fn truncate(s: &str) -> String {
    if s.chars().count() <= MAX_STRING_LEN {
        return s.to_string();
    }
    let mut truncated: String = s.chars().take(MAX_STRING_LEN).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}
