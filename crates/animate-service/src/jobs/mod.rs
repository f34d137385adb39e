//! Background generation jobs.
//!
//! Handlers push [`Job`](animate_core::Job)s onto the [`JobQueue`]; workers
//! run the pipeline and write [`JobProgress`](animate_core::JobProgress) to the
//! store, where handlers poll it.

mod pipeline;
mod queue;
mod worker;

pub use pipeline::{process_job, PipelineError};
pub use queue::{JobQueue, QueueError};
pub use worker::{spawn_janitor, spawn_workers};
