use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex, mpsc};

use crate::domain::JobId;

/// Unbounded FIFO of jobs awaiting a worker.
///
/// Submissions never wait on it; workers share the receiving end and each
/// entry is handed to exactly one of them.
#[derive(Clone)]
pub struct JobQueue {
    sender: mpsc::UnboundedSender<JobId>,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<JobId>>>,
    depth: Arc<AtomicUsize>,
}

impl JobQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            depth: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn enqueue(&self, job_id: JobId) -> Result<(), QueueError> {
        self.depth.fetch_add(1, Ordering::SeqCst);
        if let Err(mpsc::error::SendError(job_id)) = self.sender.send(job_id) {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            return Err(QueueError::Closed(job_id));
        }
        Ok(())
    }

    /// Waits until a job is available. Cancel-safe: an entry is only taken
    /// off the queue when this future completes.
    pub async fn dequeue(&self) -> Option<JobId> {
        let mut receiver = self.receiver.lock().await;
        let job_id = receiver.recv().await?;
        self.depth.fetch_sub(1, Ordering::SeqCst);
        Some(job_id)
    }

    /// Jobs enqueued but not yet picked up by a worker.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("job queue closed, could not enqueue {0}")]
    Closed(JobId),
}
