//! In-memory dispatch queue
//!
//! A bounded lock-free ring buffer with backpressure: when the buffer is
//! full, `publish` fails and the admission saga refunds the caller rather
//! than block.

use async_trait::async_trait;
use crossbeam::queue::ArrayQueue;

use super::publisher::{JobMessage, JobPublisher};

pub struct MemoryJobQueue {
    buffer: ArrayQueue<JobMessage>,
}

impl MemoryJobQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: ArrayQueue::new(capacity),
        }
    }

    /// Try to push a job to the queue
    /// Returns false if queue is full (backpressure)
    pub fn try_push(&self, job: JobMessage) -> bool {
        self.buffer.push(job).is_ok()
    }

    /// Try to pop a job from the queue (consumer side)
    pub fn try_pop(&self) -> Option<JobMessage> {
        self.buffer.pop()
    }

    /// Get current queue length
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if queue is empty
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[async_trait]
impl JobPublisher for MemoryJobQueue {
    async fn publish(&self, job: &JobMessage) -> Result<(), String> {
        if self.try_push(job.clone()) {
            log::debug!("[memory] queued mission {}", job.mission_id);
            Ok(())
        } else {
            Err(format!(
                "queue full ({} jobs waiting)",
                self.buffer.capacity()
            ))
        }
    }

    fn name(&self) -> &str {
        "memory"
    }
}
