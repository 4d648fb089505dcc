//! Dispatch channel between admission and the simulation worker pool.

pub mod mock;
pub mod publisher;
pub mod queue;

pub use mock::MockJobPublisher;
pub use publisher::{JobMessage, JobParams, JobPublisher};
pub use queue::MemoryJobQueue;
