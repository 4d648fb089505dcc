//! Mission store
//!
//! Mission rows live in a primary tree keyed by mission id, with a
//! `[owner_id BE][mission_id BE]` index tree for per-owner listing. All
//! conditional updates go through a compare-and-swap loop on the primary
//! row, so concurrent writers (gateway, worker callbacks, sweeper) never
//! clobber each other: the loser re-reads and re-checks its precondition.

use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::Transactional;

use crate::common_utils::{get_current_timestamp_ms, key_owner_record, key_u64, record_id_from_key};
use crate::models::{AdmissionError, MissionId, MissionRecord, MissionStatus};

const MISSIONS_TREE: &str = "missions";
const MISSIONS_BY_OWNER_TREE: &str = "missions_by_owner";

/// Mission rows on sled.
pub struct MissionDb {
    db: sled::Db,
    missions: sled::Tree,
    by_owner: sled::Tree,
}

impl MissionDb {
    pub fn open(db: &sled::Db) -> Result<Self, AdmissionError> {
        Ok(Self {
            db: db.clone(),
            missions: db.open_tree(MISSIONS_TREE).map_err(store_err)?,
            by_owner: db.open_tree(MISSIONS_BY_OWNER_TREE).map_err(store_err)?,
        })
    }

    /// Store a mission row. The row and its owner-index entry commit in
    /// one transaction, so neither can exist without the other.
    pub fn insert(&self, mission: &MissionRecord) -> Result<(), AdmissionError> {
        let key = key_u64(mission.id.as_u64());
        let index_key = key_owner_record(mission.owner_id, mission.id.as_u64());
        let bytes = serde_json::to_vec(mission).map_err(codec_err)?;

        let result: Result<(), TransactionError<AdmissionError>> =
            (&self.missions, &self.by_owner).transaction(|(missions, by_owner)| {
                missions.insert(&key[..], bytes.as_slice())?;
                by_owner.insert(&index_key[..], &[][..])?;
                Ok(())
            });
        result.map_err(commit_err)?;

        self.db.flush().map_err(store_err)?;
        Ok(())
    }

    pub fn get(&self, id: MissionId) -> Result<Option<MissionRecord>, AdmissionError> {
        let key = key_u64(id.as_u64());
        match self.missions.get(&key[..]).map_err(store_err)? {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw).map_err(codec_err)?)),
            None => Ok(None),
        }
    }

    /// Owner-scoped read. A mission belonging to someone else is
    /// indistinguishable from a missing one.
    pub fn get_for_owner(
        &self,
        owner_id: u64,
        id: MissionId,
    ) -> Result<Option<MissionRecord>, AdmissionError> {
        match self.get(id)? {
            Some(m) if m.owner_id == owner_id => Ok(Some(m)),
            _ => Ok(None),
        }
    }

    /// Remove a mission row and its index entry in one transaction. Used
    /// only to compensate an admission whose charge never committed.
    pub fn delete(&self, id: MissionId) -> Result<(), AdmissionError> {
        let key = key_u64(id.as_u64());

        let result: Result<(), TransactionError<AdmissionError>> =
            (&self.missions, &self.by_owner).transaction(|(missions, by_owner)| {
                let Some(raw) = missions.get(&key[..])? else {
                    return Ok(());
                };
                let mission: MissionRecord =
                    serde_json::from_slice(&raw).map_err(abort_codec)?;
                let index_key = key_owner_record(mission.owner_id, id.as_u64());
                missions.remove(&key[..])?;
                by_owner.remove(&index_key[..])?;
                Ok(())
            });
        result.map_err(commit_err)?;

        self.db.flush().map_err(store_err)?;
        Ok(())
    }

    /// One owner's missions, newest first. `page` is 1-based.
    pub fn list_for_owner(
        &self,
        owner_id: u64,
        page: usize,
        page_size: usize,
    ) -> Result<(Vec<MissionRecord>, usize), AdmissionError> {
        let prefix = key_u64(owner_id);
        let skip = page.saturating_sub(1).saturating_mul(page_size);

        let mut items = Vec::new();
        let mut total = 0usize;
        for entry in self.by_owner.scan_prefix(&prefix[..]).rev() {
            let (index_key, _) = entry.map_err(store_err)?;
            let Some(mission_id) = record_id_from_key(&index_key) else {
                continue;
            };
            if total >= skip && items.len() < page_size {
                // Tolerate an index entry whose row is mid-delete
                if let Some(mission) = self.get(MissionId::new(mission_id))? {
                    items.push(mission);
                }
            }
            total += 1;
        }
        Ok((items, total))
    }

    /// Set `status = new` if the row currently has `expected`.
    /// Returns whether the update applied.
    pub fn update_status_if(
        &self,
        id: MissionId,
        expected: MissionStatus,
        new: MissionStatus,
    ) -> Result<bool, AdmissionError> {
        let now = get_current_timestamp_ms();
        self.modify(id, move |m| {
            if m.status != expected {
                return None;
            }
            let mut next = m.clone();
            apply_status(&mut next, new, now);
            Some(next)
        })
    }

    /// Status update that also records why the mission failed.
    pub fn update_status_with_error(
        &self,
        id: MissionId,
        expected: MissionStatus,
        new: MissionStatus,
        error: &str,
    ) -> Result<bool, AdmissionError> {
        let now = get_current_timestamp_ms();
        self.modify(id, move |m| {
            if m.status != expected {
                return None;
            }
            let mut next = m.clone();
            apply_status(&mut next, new, now);
            next.error_message = Some(error.to_string());
            Some(next)
        })
    }

    /// Fail the mission and flag that its charge still has to come back.
    /// One write, so a crash right after leaves a row the sweeper finds.
    pub fn mark_failed_pending_refund(
        &self,
        id: MissionId,
        expected: MissionStatus,
        error: &str,
    ) -> Result<bool, AdmissionError> {
        let now = get_current_timestamp_ms();
        self.modify(id, move |m| {
            if m.status != expected {
                return None;
            }
            let mut next = m.clone();
            apply_status(&mut next, MissionStatus::Failed, now);
            next.error_message = Some(error.to_string());
            next.refund_pending = true;
            Some(next)
        })
    }

    /// Record the worker-side job identifier.
    pub fn set_job_ref(&self, id: MissionId, job_ref: &str) -> Result<bool, AdmissionError> {
        let now = get_current_timestamp_ms();
        self.modify(id, move |m| {
            let mut next = m.clone();
            next.job_ref = Some(job_ref.to_string());
            next.updated_at = now;
            Some(next)
        })
    }

    pub fn set_refund_pending(
        &self,
        id: MissionId,
        pending: bool,
    ) -> Result<bool, AdmissionError> {
        let now = get_current_timestamp_ms();
        self.modify(id, move |m| {
            if m.refund_pending == pending {
                return None;
            }
            let mut next = m.clone();
            next.refund_pending = pending;
            next.updated_at = now;
            Some(next)
        })
    }

    /// Missions still owed a refund, up to `limit`. Full scan; the flag is
    /// rare and short-lived, so this stays cheap.
    pub fn list_refund_pending(
        &self,
        limit: usize,
    ) -> Result<Vec<MissionRecord>, AdmissionError> {
        let mut pending = Vec::new();
        for entry in self.missions.iter() {
            let (_, raw) = entry.map_err(store_err)?;
            let mission: MissionRecord = serde_json::from_slice(&raw).map_err(codec_err)?;
            if mission.refund_pending {
                pending.push(mission);
                if pending.len() >= limit {
                    break;
                }
            }
        }
        Ok(pending)
    }

    /// Compare-and-swap modify loop.
    ///
    /// `f` gets the current row and returns the replacement, or None when
    /// its precondition no longer holds. Returns whether a write happened;
    /// a missing row is "not applied", matching conditional-update
    /// semantics elsewhere.
    fn modify<F>(&self, id: MissionId, f: F) -> Result<bool, AdmissionError>
    where
        F: Fn(&MissionRecord) -> Option<MissionRecord>,
    {
        let key = key_u64(id.as_u64());
        loop {
            let Some(raw) = self.missions.get(&key[..]).map_err(store_err)? else {
                return Ok(false);
            };
            let current: MissionRecord = serde_json::from_slice(&raw).map_err(codec_err)?;
            let Some(updated) = f(&current) else {
                return Ok(false);
            };
            let new_raw = serde_json::to_vec(&updated).map_err(codec_err)?;

            match self
                .missions
                .compare_and_swap(&key[..], Some(raw), Some(new_raw))
                .map_err(store_err)?
            {
                Ok(()) => {
                    self.db.flush().map_err(store_err)?;
                    return Ok(true);
                }
                // Raced with another writer; re-read and re-check
                Err(_) => continue,
            }
        }
    }
}

fn apply_status(mission: &mut MissionRecord, new: MissionStatus, now: i64) {
    mission.status = new;
    mission.updated_at = now;
    if new.is_terminal() {
        mission.completed_at = Some(now);
    }
}

fn store_err(err: sled::Error) -> AdmissionError {
    AdmissionError::StoreUnavailable(err.to_string())
}

fn codec_err(err: serde_json::Error) -> AdmissionError {
    AdmissionError::Internal(format!("mission codec: {}", err))
}

fn abort_codec(err: serde_json::Error) -> ConflictableTransactionError<AdmissionError> {
    ConflictableTransactionError::Abort(codec_err(err))
}

fn commit_err(err: TransactionError<AdmissionError>) -> AdmissionError {
    match err {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => store_err(e),
    }
}
