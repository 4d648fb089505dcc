//! Admission compensation
//!
//! Undoes the partial effects of an admission that could not finish. Two
//! shapes exist: a mission whose charge never committed is simply deleted,
//! and a charged mission whose dispatch failed is failed and refunded.
//! Refunds commit at most once, keyed on the ledger entry that references
//! the mission.

use std::sync::Arc;

use crate::db::{acquire_owner_lock, LedgerDb, MissionDb};
use crate::models::{AdmissionError, MissionId, MissionRecord, TransactionKind, TransactionMeta};

/// How a failed mission's charge was squared away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefundOutcome {
    /// A refund entry is on the ledger, written now or found already there
    Refunded,
    /// The refund write failed but the mission is flagged; the sweeper
    /// re-drives it
    SweeperOwed,
}

/// Compensation steps shared by the admission path and the refund sweeper.
#[derive(Clone)]
pub struct Compensator {
    ledger: Arc<LedgerDb>,
    missions: Arc<MissionDb>,
}

impl Compensator {
    pub fn new(ledger: Arc<LedgerDb>, missions: Arc<MissionDb>) -> Self {
        Self { ledger, missions }
    }

    /// Remove a mission row whose charge never committed.
    ///
    /// Nothing left the ledger, so deleting the row restores the world
    /// exactly as it was before the request.
    pub fn delete_uncharged(&self, mission_id: MissionId) -> Result<(), AdmissionError> {
        self.missions.delete(mission_id)?;
        log::info!("Deleted uncharged mission {}", mission_id);
        Ok(())
    }

    /// Fail a charged mission and put its credits back.
    ///
    /// The failure and the refund debt go down in one mission write before
    /// any money moves. The refund is attempted no matter how that write
    /// went: the mission store and the ledger fail independently, and the
    /// charge must come back whenever the ledger will take it. An error
    /// here means the refund is still owed and no flag marks the mission
    /// for the sweeper.
    pub fn refund_failed_mission(
        &self,
        mission: &MissionRecord,
        reason: &str,
    ) -> Result<RefundOutcome, AdmissionError> {
        // 1. Record the failure and the refund debt
        let flagged = match self
            .missions
            .mark_failed_pending_refund(mission.id, mission.status, reason)
        {
            Ok(true) => true,
            Ok(false) => {
                // Someone else already moved the mission on; the refund
                // check below still decides on ledger evidence alone
                log::warn!(
                    "Mission {} left {} before failure could be recorded",
                    mission.id,
                    mission.status
                );
                false
            }
            Err(e) => {
                log::error!(
                    "CRITICAL: mission {} charged but failure not recorded: {}",
                    mission.id,
                    e
                );
                false
            }
        };

        // 2. Refund the charge
        match self.redrive_refund(mission) {
            Ok(_) => Ok(RefundOutcome::Refunded),
            Err(refund_err) if flagged => {
                log::warn!(
                    "Refund for mission {} failed, left to the sweeper: {}",
                    mission.id,
                    refund_err
                );
                Ok(RefundOutcome::SweeperOwed)
            }
            Err(refund_err) => Err(refund_err),
        }
    }

    /// Commit the refund a failed mission is owed, exactly once.
    ///
    /// Returns whether this call moved credits: false means the ledger
    /// already held a refund entry for the mission and only the pending
    /// flag needed clearing. Safe to call repeatedly, which is what the
    /// sweeper does. An error means the refund is still not on the
    /// ledger; once it is, a failing flag clear is only logged, since the
    /// next sweep finds the entry and retries the clear.
    pub fn redrive_refund(&self, mission: &MissionRecord) -> Result<bool, AdmissionError> {
        let lock = self.ledger.owner_lock(mission.owner_id);
        let _guard = acquire_owner_lock(&lock, mission.owner_id, self.ledger.lock_timeout())?;

        // A refund entry referencing this mission means the credits are
        // already back, whoever wrote it
        if self
            .ledger
            .find_mission_transaction(mission.owner_id, mission.id, TransactionKind::Refund)?
            .is_some()
        {
            self.clear_refund_flag(mission.id);
            return Ok(false);
        }

        let meta = TransactionMeta::refund(
            format!("Refund for mission {}", mission.id),
            mission.id,
        );
        let new_balance =
            self.ledger
                .adjust_locked(mission.owner_id, mission.cost_charged as i64, meta)?;

        self.clear_refund_flag(mission.id);

        log::info!(
            "Refunded {} credits to owner {} for mission {} (balance now {})",
            mission.cost_charged,
            mission.owner_id,
            mission.id,
            new_balance
        );
        Ok(true)
    }

    fn clear_refund_flag(&self, mission_id: MissionId) {
        if let Err(e) = self.missions.set_refund_pending(mission_id, false) {
            log::warn!("Mission {} refund flag not cleared: {}", mission_id, e);
        }
    }
}
