//! The job trait and failure record.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use thiserror::Error;

use crate::lane::Lane;

/// Error returned by a failed job run.
#[derive(Debug, Clone, Error)]
#[error("job failed: {message}")]
pub struct JobError {
    /// Human-readable failure description.
    pub message: String,
}

impl JobError {
    /// Creates a new job error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A unit of background work.
///
/// Implementations must be self-contained: everything a run needs is
/// captured at enqueue time. A job's `run` is awaited to completion by a
/// lane worker; retry policy, if any, lives inside the job itself.
pub trait Job: Send + Sync + 'static {
    /// Name used in logs and failure reports.
    fn name(&self) -> &str;

    /// Executes the job.
    fn run(&self) -> BoxFuture<'_, Result<(), JobError>>;
}

/// Record of a job run that returned an error.
///
/// Handed to every registered failure hook; also what the failed-job
/// monitor classifies.
#[derive(Debug, Clone)]
pub struct JobFailure {
    /// Name of the failing job.
    pub job_name: String,
    /// Lane the job ran on.
    pub lane: Lane,
    /// Error message from the failed run.
    pub error: String,
    /// When the failure was recorded.
    pub failed_at: DateTime<Utc>,
}

impl JobFailure {
    /// Creates a failure record for the given job and error.
    #[must_use]
    pub fn new(job_name: impl Into<String>, lane: Lane, error: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
            lane,
            error: error.into(),
            failed_at: Utc::now(),
        }
    }
}

/// A job built from a closure, convenient for small units of work.
pub struct FnJob<F> {
    name: String,
    f: F,
}

impl<F> FnJob<F>
where
    F: Fn() -> BoxFuture<'static, Result<(), JobError>> + Send + Sync + 'static,
{
    /// Wraps a future-producing closure as a job.
    #[must_use]
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Job for FnJob<F>
where
    F: Fn() -> BoxFuture<'static, Result<(), JobError>> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self) -> BoxFuture<'_, Result<(), JobError>> {
        (self.f)()
    }
}
