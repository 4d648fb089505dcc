//! Admission control
//!
//! Turns a submit request into a queued, paid-for mission or into nothing
//! at all. The order of effects is fixed: validate, price, then under the
//! owner's ledger lock check-insert-charge, then release the lock and
//! dispatch. Each failure branch undoes exactly the effects committed
//! before it, so no owner ever keeps a charge without a dispatched job or
//! a recorded refund.

use std::sync::Arc;

use crate::admission::compensator::{Compensator, RefundOutcome};
use crate::admission::cost::mission_cost;
use crate::admission::validator::validate_mission_params;
use crate::common_utils::get_current_timestamp_ms;
use crate::db::{acquire_owner_lock, LedgerDb, MissionDb};
use crate::dispatch::{JobMessage, JobPublisher};
use crate::metrics::{AdmissionMetrics, LatencyTimer};
use crate::models::{
    AdmissionError, MissionId, MissionParams, MissionRecord, MissionStatus, TransactionMeta,
};
use crate::utils::generate_record_id;

#[derive(Clone)]
pub struct AdmissionController {
    ledger: Arc<LedgerDb>,
    missions: Arc<MissionDb>,
    publisher: Arc<dyn JobPublisher>,
    compensator: Compensator,
    metrics: Arc<AdmissionMetrics>,
}

impl AdmissionController {
    pub fn new(
        ledger: Arc<LedgerDb>,
        missions: Arc<MissionDb>,
        publisher: Arc<dyn JobPublisher>,
        metrics: Arc<AdmissionMetrics>,
    ) -> Self {
        let compensator = Compensator::new(ledger.clone(), missions.clone());
        Self {
            ledger,
            missions,
            publisher,
            compensator,
            metrics,
        }
    }

    /// The compensator wired to this controller's stores.
    ///
    /// The refund sweeper shares it so both re-drive refunds through the
    /// same at-most-once path.
    pub fn compensator(&self) -> Compensator {
        self.compensator.clone()
    }

    /// Admit a mission: validate, charge, dispatch.
    pub async fn submit_mission(
        &self,
        owner_id: u64,
        params: MissionParams,
    ) -> Result<MissionRecord, AdmissionError> {
        let timer = LatencyTimer::start();
        self.metrics.record_submission();

        let result = self.submit_inner(owner_id, params).await;
        self.metrics.record_latency(timer.elapsed_ms());

        match &result {
            Ok(mission) => {
                self.metrics.record_admitted();
                log::info!(
                    "Admitted mission {} for owner {} ({} credits, status {})",
                    mission.id,
                    owner_id,
                    mission.cost_charged,
                    mission.status
                );
            }
            Err(AdmissionError::InsufficientCredits { balance, required }) => {
                self.metrics.record_insufficient();
                log::info!(
                    "Rejected owner {}: insufficient credits (have {}, need {})",
                    owner_id,
                    balance,
                    required
                );
            }
            Err(e) if e.is_user_error() => {
                self.metrics.record_validation_error();
            }
            Err(AdmissionError::QueueUnavailable(_)) => {
                self.metrics.record_queue_error();
            }
            Err(e) => {
                self.metrics.record_store_error();
                log::error!("Admission failed for owner {}: {}", owner_id, e);
            }
        }

        result
    }

    async fn submit_inner(
        &self,
        owner_id: u64,
        mut params: MissionParams,
    ) -> Result<MissionRecord, AdmissionError> {
        // 1. Validate and normalize before touching any state
        let last_known_ms = validate_mission_params(&mut params)?;

        // 2. Price the normalized parameters
        let cost = mission_cost(&params);

        // 3.-6. under the owner's ledger lock: check, insert, charge.
        // The guard must drop before the dispatch await below.
        let mission = {
            let lock = self.ledger.owner_lock(owner_id);
            let _guard = acquire_owner_lock(&lock, owner_id, self.ledger.lock_timeout())?;

            // 3. Balance check (materializes the first-access grant)
            let balance = self.ledger.balance_locked(owner_id)?;
            if balance < cost {
                return Err(AdmissionError::InsufficientCredits {
                    balance,
                    required: cost,
                });
            }

            // 4. Persist the mission row before moving money
            let now = get_current_timestamp_ms();
            let mission = MissionRecord {
                id: MissionId::new(generate_record_id()),
                owner_id,
                name: params.name.clone(),
                description: params.description.clone(),
                last_known_lat: params.last_known_lat,
                last_known_lon: params.last_known_lon,
                last_known_time: last_known_ms,
                object_type: params.object_type.clone(),
                uncertainty_radius_m: params.uncertainty_radius_m,
                forecast_hours: params.forecast_hours,
                ensemble_size: params.ensemble_size,
                backtracking: params.backtracking,
                cost_charged: cost,
                status: MissionStatus::Created,
                refund_pending: false,
                job_ref: None,
                error_message: None,
                created_at: now,
                updated_at: now,
                completed_at: None,
            };
            self.missions.insert(&mission)?;

            // 5. Charge. If the commit fails the row comes straight back
            //    out; nothing was paid, so nothing is owed
            let meta = TransactionMeta::deduction(
                format!(
                    "Mission: {} ({} forecast hours, {} particles)",
                    mission.name, mission.forecast_hours, mission.ensemble_size
                ),
                mission.id,
            );
            if let Err(e) = self.ledger.adjust_locked(owner_id, -(cost as i64), meta) {
                self.metrics.record_rollback();
                if let Err(del) = self.compensator.delete_uncharged(mission.id) {
                    log::error!(
                        "CRITICAL: uncharged mission {} row not deleted: {}",
                        mission.id,
                        del
                    );
                }
                return Err(e);
            }

            // 6. Lock releases here; the charge is durable
            mission
        };

        // 7. Dispatch. From this point a failure owes the owner a refund
        let job = JobMessage::for_mission(&mission);
        if let Err(reason) = self.publisher.publish(&job).await {
            log::warn!(
                "Dispatch of mission {} via {} failed: {}",
                mission.id,
                self.publisher.name(),
                reason
            );
            let detail = format!("dispatch failed: {}", reason);
            match self.compensator.refund_failed_mission(&mission, &detail) {
                Ok(RefundOutcome::Refunded) => self.metrics.record_refund(),
                Ok(RefundOutcome::SweeperOwed) => {
                    // Flagged; the sweeper finishes the job
                    self.metrics.record_refund_pending();
                }
                Err(e) => {
                    self.metrics.record_store_error();
                    log::error!(
                        "CRITICAL: mission {} charged, not dispatched, and no refund recorded: {}",
                        mission.id,
                        e
                    );
                }
            }
            return Err(AdmissionError::QueueUnavailable(reason));
        }

        // 8. Mark queued, then answer from local state. The charge is
        //    durable and the job dispatched, so nothing past this point
        //    may turn the admission into an error; the worker's callback
        //    is authoritative for the row from here on anyway.
        let mut admitted = mission;
        match self.missions.update_status_if(
            admitted.id,
            MissionStatus::Created,
            MissionStatus::Queued,
        ) {
            Ok(true) => admitted.status = MissionStatus::Queued,
            Ok(false) => {
                // A worker callback got there first; prefer its row
                if let Ok(Some(current)) = self.missions.get(admitted.id) {
                    admitted = current;
                }
            }
            Err(e) => {
                log::warn!("Mission {} queued-status write failed: {}", admitted.id, e);
            }
        }

        Ok(admitted)
    }

    /// Apply a worker status callback.
    ///
    /// Only the forward edges of the lifecycle are accepted; repeating the
    /// row's current status succeeds without writing, so at-least-once
    /// delivery is safe. Worker-reported failures never touch the ledger:
    /// dispatched work counts as delivered.
    pub fn update_mission_status(
        &self,
        mission_id: MissionId,
        new_status: MissionStatus,
        job_ref: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<MissionRecord, AdmissionError> {
        loop {
            let mission = self
                .missions
                .get(mission_id)?
                .ok_or(AdmissionError::MissionNotFound(mission_id))?;

            // Duplicate delivery of the current status
            if mission.status == new_status {
                return Ok(mission);
            }

            if !mission.status.can_transition_to(new_status) {
                return Err(AdmissionError::InvalidStatusTransition {
                    from: mission.status,
                    to: new_status,
                });
            }

            let applied = match error_message {
                Some(err) => self.missions.update_status_with_error(
                    mission_id,
                    mission.status,
                    new_status,
                    err,
                )?,
                None => self
                    .missions
                    .update_status_if(mission_id, mission.status, new_status)?,
            };
            if !applied {
                // Raced with another callback; re-read and re-decide
                continue;
            }

            if let Some(job_ref) = job_ref {
                self.missions.set_job_ref(mission_id, job_ref)?;
            }

            log::info!(
                "Mission {} status {} -> {}",
                mission_id,
                mission.status,
                new_status
            );

            return self
                .missions
                .get(mission_id)?
                .ok_or(AdmissionError::MissionNotFound(mission_id));
        }
    }

    /// Owner-scoped mission read. Missions of other owners come back as
    /// NotFound, never as a permissions error.
    pub fn get_mission(
        &self,
        owner_id: u64,
        mission_id: MissionId,
    ) -> Result<MissionRecord, AdmissionError> {
        self.missions
            .get_for_owner(owner_id, mission_id)?
            .ok_or(AdmissionError::MissionNotFound(mission_id))
    }

    /// One owner's missions, newest first. Returns the page and the
    /// owner's total mission count.
    pub fn list_missions(
        &self,
        owner_id: u64,
        page: usize,
        page_size: usize,
    ) -> Result<(Vec<MissionRecord>, usize), AdmissionError> {
        self.missions.list_for_owner(owner_id, page, page_size)
    }
}
