//! Alert deduplication via a keyed rate limiter.
//!
//! The limiter keys on listener name and event type, so a storm of the
//! same kind of event produces one delivery per TTL window. The check and
//! the mark are separate store calls, not an atomic reservation: two
//! concurrent deliveries of the same key can both pass the check. For
//! admin alerting a rare duplicate beats the cost of a locking store.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{error, info};

use opsdesk_alerts::AlertEvent;

/// Error from a rate-limit store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached.
    #[error("rate limit store unavailable: {reason}")]
    Unavailable {
        /// What went wrong.
        reason: String,
    },
}

/// Keyed TTL store backing the rate limiter.
pub trait RateLimitStore: Send + Sync {
    /// Whether the key was marked within its TTL.
    fn is_marked(&self, key: &str) -> BoxFuture<'_, Result<bool, StoreError>>;

    /// Marks the key for the given TTL.
    fn mark(&self, key: &str, ttl: Duration) -> BoxFuture<'_, Result<(), StoreError>>;
}

/// In-memory TTL store.
///
/// Expired entries are dropped lazily on the next `mark`, so memory use is
/// bounded by the number of distinct keys seen within their TTLs plus
/// stragglers awaiting the next write.
#[derive(Default)]
pub struct MemoryRateLimitStore {
    entries: Mutex<HashMap<String, Instant>>,
}

impl MemoryRateLimitStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.lock().values().filter(|e| **e > now).count()
    }

    /// Whether the store holds no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RateLimitStore for MemoryRateLimitStore {
    fn is_marked(&self, key: &str) -> BoxFuture<'_, Result<bool, StoreError>> {
        let marked = self
            .entries
            .lock()
            .get(key)
            .is_some_and(|expires| *expires > Instant::now());
        Box::pin(async move { Ok(marked) })
    }

    fn mark(&self, key: &str, ttl: Duration) -> BoxFuture<'_, Result<(), StoreError>> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        entries.retain(|_, expires| *expires > now);
        entries.insert(key.to_string(), now + ttl);
        Box::pin(async { Ok(()) })
    }
}

/// Deduplicates alert deliveries per listener and event type.
pub struct RateLimiter {
    store: std::sync::Arc<dyn RateLimitStore>,
}

impl RateLimiter {
    /// Creates a limiter over the given store.
    pub fn new(store: std::sync::Arc<dyn RateLimitStore>) -> Self {
        Self { store }
    }

    /// Dedup key for a listener and event.
    #[must_use]
    pub fn key(listener: &str, event: &AlertEvent) -> String {
        format!("alerts:{listener}:{}", event.event_type())
    }

    /// Whether this event was already delivered within its TTL window.
    ///
    /// Fails open: if the store is unreachable the event is treated as
    /// fresh and an error is logged, since a missed alert costs more than
    /// a duplicate.
    pub async fn is_duplicate(&self, listener: &str, event: &AlertEvent) -> bool {
        let key = Self::key(listener, event);
        match self.store.is_marked(&key).await {
            Ok(marked) => {
                if marked {
                    info!(%key, "alert suppressed as duplicate");
                }
                marked
            }
            Err(e) => {
                error!(%key, error = %e, "rate limit check failed, delivering anyway");
                false
            }
        }
    }

    /// Marks the event as delivered for its severity's TTL.
    ///
    /// Store errors are logged and swallowed; delivery proceeds.
    pub async fn mark_sent(&self, listener: &str, event: &AlertEvent) {
        let key = Self::key(listener, event);
        let ttl = event.severity().rate_limit_ttl();
        if let Err(e) = self.store.mark(&key, ttl).await {
            error!(%key, error = %e, "rate limit mark failed");
        }
    }
}
