//! Bounded in-process job queue shared by handlers and workers.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use animate_core::Job;

/// Errors when enqueueing.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The queue is at capacity.
    #[error("job queue is full")]
    Full,
    /// No worker is left to receive jobs.
    #[error("job queue is closed")]
    Closed,
}

/// Multi-producer, multi-consumer job queue.
///
/// Workers share the receiver behind an async mutex; whoever holds it waits
/// for the next job, so each job goes to exactly one worker.
#[derive(Debug, Clone)]
pub struct JobQueue {
    sender: mpsc::Sender<Job>,
    receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
}

impl JobQueue {
    /// Create a queue holding at most `capacity` waiting jobs.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
        }
    }

    /// Enqueue without waiting.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Full` at capacity and `QueueError::Closed` if the
    /// receiving side is gone.
    pub fn push(&self, job: Job) -> Result<(), QueueError> {
        self.sender.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => QueueError::Full,
            mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
        })
    }

    /// Wait for the next job. `None` once every sender is dropped.
    pub async fn next(&self) -> Option<Job> {
        self.receiver.lock().await.recv().await
    }

    /// Jobs waiting to be picked up.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    /// Maximum number of waiting jobs.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }
}
