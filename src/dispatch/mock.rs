//! Mock publisher for testing
//!
//! Allows scripting the outcome per mission and records everything that
//! reached the channel.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::publisher::{JobMessage, JobPublisher};
use crate::models::MissionId;

pub struct MockJobPublisher {
    /// Map of mission id -> scripted outcome
    results: Mutex<HashMap<u64, Result<(), String>>>,
    /// Outcome when no specific result is set
    default_result: Mutex<Result<(), String>>,
    /// Jobs that were accepted (scripted Ok)
    published: Mutex<Vec<JobMessage>>,
}

impl MockJobPublisher {
    pub fn new() -> Self {
        Self {
            results: Mutex::new(HashMap::new()),
            default_result: Mutex::new(Ok(())),
            published: Mutex::new(Vec::new()),
        }
    }

    /// Script the outcome for one mission
    pub fn set_result(&self, mission_id: MissionId, result: Result<(), String>) {
        self.results
            .lock()
            .unwrap()
            .insert(mission_id.as_u64(), result);
    }

    /// Script the outcome for every mission without a specific entry
    pub fn set_default_result(&self, result: Result<(), String>) {
        *self.default_result.lock().unwrap() = result;
    }

    pub fn clear(&self) {
        self.results.lock().unwrap().clear();
        self.published.lock().unwrap().clear();
    }

    /// Everything that was accepted, in publish order
    pub fn published(&self) -> Vec<JobMessage> {
        self.published.lock().unwrap().clone()
    }

    pub fn publish_count(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    fn result_for(&self, mission_id: MissionId) -> Result<(), String> {
        self.results
            .lock()
            .unwrap()
            .get(&mission_id.as_u64())
            .cloned()
            .unwrap_or_else(|| self.default_result.lock().unwrap().clone())
    }
}

impl Default for MockJobPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobPublisher for MockJobPublisher {
    async fn publish(&self, job: &JobMessage) -> Result<(), String> {
        log::debug!("[mock] publish({})", job.mission_id);
        let result = self.result_for(job.mission_id);
        if result.is_ok() {
            self.published.lock().unwrap().push(job.clone());
        }
        result
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::publisher::JobParams;

    fn job(id: u64) -> JobMessage {
        JobMessage {
            mission_id: MissionId::new(id),
            params: JobParams {
                latitude: 10.0,
                longitude: 20.0,
                start_time: "2025-06-01T12:00:00+00:00".to_string(),
                duration_hours: 24,
                num_particles: 1000,
                object_type: 1,
                backtracking: false,
            },
        }
    }

    #[tokio::test]
    async fn test_mock_default_ok() {
        let mock = MockJobPublisher::new();
        assert!(mock.publish(&job(1)).await.is_ok());
        assert_eq!(mock.publish_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_scripted_failure() {
        let mock = MockJobPublisher::new();
        mock.set_result(MissionId::new(2), Err("broker down".to_string()));

        let err = mock.publish(&job(2)).await.unwrap_err();
        assert_eq!(err, "broker down");
        // Rejected jobs never show up in the log
        assert_eq!(mock.publish_count(), 0);

        assert!(mock.publish(&job(3)).await.is_ok());
        assert_eq!(mock.publish_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_default_failure() {
        let mock = MockJobPublisher::new();
        mock.set_default_result(Err("queue full".to_string()));

        assert!(mock.publish(&job(4)).await.is_err());
        assert!(mock.published().is_empty());
    }
}
