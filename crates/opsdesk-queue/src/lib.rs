//! Priority-lane background job queue for Opsdesk.
//!
//! Jobs are boxed [`Job`] implementations pushed onto one of six [`Lane`]s.
//! Each lane is drained by its own tokio worker, so a slow low-priority job
//! never delays critical work. Failure hooks observe every failed run,
//! which is how the failed-job monitor taps into the queue.
//!
//! # Example
//!
//! ```no_run
//! use opsdesk_queue::{FnJob, JobQueue, Lane};
//!
//! # async fn example() {
//! let queue = JobQueue::start();
//! queue
//!     .enqueue(
//!         Box::new(FnJob::new("warm-cache", || Box::pin(async { Ok(()) }))),
//!         Lane::Low,
//!     )
//!     .unwrap();
//! queue.shutdown().await;
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod job;
mod lane;
mod queue;

pub use error::{QueueError, Result};
pub use job::{FnJob, Job, JobError, JobFailure};
pub use lane::Lane;
pub use queue::{FailureHook, JobQueue};
