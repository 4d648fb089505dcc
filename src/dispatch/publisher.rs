//! Job publisher seam
//!
//! The gateway hands admitted missions to the simulation worker pool
//! through this trait. The channel is at-least-once: a published job may
//! be redelivered, and consumers dedup by mission id.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::common_utils::rfc3339_from_ms;
use crate::models::{MissionId, MissionRecord};

/// Simulation inputs as the worker pool expects them.
///
/// Field names are the worker contract; do not rename.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobParams {
    pub latitude: f64,
    pub longitude: f64,
    /// RFC3339
    pub start_time: String,
    pub duration_hours: u32,
    pub num_particles: u32,
    /// Numeric object class; unknown labels fall back to 1
    /// (person-in-water)
    pub object_type: i32,
    pub backtracking: bool,
}

/// One queued simulation job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMessage {
    pub mission_id: MissionId,
    pub params: JobParams,
}

impl JobMessage {
    pub fn for_mission(mission: &MissionRecord) -> Self {
        Self {
            mission_id: mission.id,
            params: JobParams {
                latitude: mission.last_known_lat,
                longitude: mission.last_known_lon,
                start_time: rfc3339_from_ms(mission.last_known_time),
                duration_hours: mission.forecast_hours,
                num_particles: mission.ensemble_size,
                object_type: mission.object_type.parse().unwrap_or(1),
                backtracking: mission.backtracking,
            },
        }
    }
}

/// Dispatch channel for admitted missions.
///
/// `publish` must only report Ok once the job is durably on the channel;
/// the admission saga refunds the charge on Err.
#[async_trait]
pub trait JobPublisher: Send + Sync {
    async fn publish(&self, job: &JobMessage) -> Result<(), String>;

    /// Get channel name for logging
    fn name(&self) -> &str;
}
