//! Credit ledger store
//!
//! Balances and the append-only transaction log live in two sled trees and
//! every mutation commits through a multi-tree transaction, so a balance
//! change and its log entry are atomic. All mutations for one owner are
//! serialized by a per-owner lock; cross-owner traffic never contends.
//!
//! Key layout (see `common_utils`): balances are keyed by owner id,
//! transactions by `[owner_id BE][txn_id BE]` so a prefix scan yields one
//! owner's history and a reverse scan yields it newest-first.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

use sled::transaction::{abort, ConflictableTransactionError, TransactionError};
use sled::Transactional;

use crate::common_utils::{get_current_timestamp_ms, key_owner_record, key_u64};
use crate::models::{
    AdmissionError, Balance, CreditPackage, CreditTransaction, MissionId, TransactionKind,
    TransactionMeta, WELCOME_GRANT_DESCRIPTION,
};
use crate::utils::generate_record_id;

const BALANCES_TREE: &str = "balances";
const TRANSACTIONS_TREE: &str = "transactions";
const PACKAGES_TREE: &str = "packages";

/// Lazily grown table of per-owner mutexes.
///
/// Entries are never removed; the set of active owners is small compared
/// to the data they generate.
struct OwnerLocks {
    inner: Mutex<HashMap<u64, Arc<Mutex<()>>>>,
}

impl OwnerLocks {
    fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    fn for_owner(&self, owner_id: u64) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().unwrap();
        map.entry(owner_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Acquire an owner's ledger lock, waiting up to `timeout`.
///
/// Holds are short (a few embedded-store commits), so a try-lock spin is
/// enough. The wait parks the OS thread in 1 ms steps: async callers
/// block their runtime worker for at most `timeout`, and only under
/// same-owner contention. A poisoned lock is reported like a timeout:
/// the caller gets a retryable error either way.
pub fn acquire_owner_lock(
    lock: &Mutex<()>,
    owner_id: u64,
    timeout: Duration,
) -> Result<MutexGuard<'_, ()>, AdmissionError> {
    let deadline = Instant::now() + timeout;
    loop {
        match lock.try_lock() {
            Ok(guard) => return Ok(guard),
            Err(TryLockError::Poisoned(_)) => {
                return Err(AdmissionError::LockTimeout(owner_id));
            }
            Err(TryLockError::WouldBlock) => {
                if Instant::now() >= deadline {
                    return Err(AdmissionError::LockTimeout(owner_id));
                }
                thread::sleep(Duration::from_millis(1));
            }
        }
    }
}

/// Credit ledger on sled.
pub struct LedgerDb {
    db: sled::Db,
    balances: sled::Tree,
    transactions: sled::Tree,
    packages: sled::Tree,
    locks: OwnerLocks,
    default_grant: u64,
    lock_timeout: Duration,
}

impl LedgerDb {
    pub fn open(
        db: &sled::Db,
        default_grant: u64,
        lock_timeout_ms: u64,
    ) -> Result<Self, AdmissionError> {
        Ok(Self {
            db: db.clone(),
            balances: db.open_tree(BALANCES_TREE).map_err(store_err)?,
            transactions: db.open_tree(TRANSACTIONS_TREE).map_err(store_err)?,
            packages: db.open_tree(PACKAGES_TREE).map_err(store_err)?,
            locks: OwnerLocks::new(),
            default_grant,
            lock_timeout: Duration::from_millis(lock_timeout_ms),
        })
    }

    /// The mutex serializing all ledger mutations for one owner.
    ///
    /// Callers that need a check and a later adjust to be one atomic unit
    /// hold this across both and use the `_locked` variants.
    pub fn owner_lock(&self, owner_id: u64) -> Arc<Mutex<()>> {
        self.locks.for_owner(owner_id)
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// Current balance; materializes the first-access grant if the owner
    /// has no row yet.
    pub fn balance(&self, owner_id: u64) -> Result<u64, AdmissionError> {
        let lock = self.owner_lock(owner_id);
        let _guard = acquire_owner_lock(&lock, owner_id, self.lock_timeout)?;
        self.balance_locked(owner_id)
    }

    /// Balance read for callers already holding the owner lock.
    pub fn balance_locked(&self, owner_id: u64) -> Result<u64, AdmissionError> {
        let (balance, _) = self.ensure_balance_locked(owner_id)?;
        Ok(balance.amount)
    }

    /// Apply a signed credit delta and append the matching log entry.
    ///
    /// Returns the balance after the commit. A delta that would take the
    /// balance negative aborts with `InsufficientCredits` and writes
    /// nothing.
    pub fn adjust(
        &self,
        owner_id: u64,
        delta: i64,
        meta: TransactionMeta,
    ) -> Result<u64, AdmissionError> {
        let lock = self.owner_lock(owner_id);
        let _guard = acquire_owner_lock(&lock, owner_id, self.lock_timeout)?;
        self.adjust_locked(owner_id, delta, meta)
    }

    /// `adjust` for callers already holding the owner lock.
    pub fn adjust_locked(
        &self,
        owner_id: u64,
        delta: i64,
        meta: TransactionMeta,
    ) -> Result<u64, AdmissionError> {
        self.ensure_balance_locked(owner_id)?;

        let key = key_u64(owner_id);
        let now = get_current_timestamp_ms();
        // Generated outside the closure so a conflict retry reuses the id
        let txn_id = generate_record_id();
        let txn_key = key_owner_record(owner_id, txn_id);

        let result: Result<u64, TransactionError<AdmissionError>> =
            (&self.balances, &self.transactions).transaction(|(balances, txns)| {
                let raw = balances.get(&key[..])?.ok_or_else(|| {
                    ConflictableTransactionError::Abort(AdmissionError::StoreUnavailable(
                        format!("balance row missing for owner {}", owner_id),
                    ))
                })?;
                let mut balance: Balance =
                    serde_json::from_slice(&raw).map_err(abort_codec)?;

                let new_amount = (balance.amount as i64)
                    .checked_add(delta)
                    .ok_or_else(|| {
                        ConflictableTransactionError::Abort(AdmissionError::Internal(
                            "balance overflow".to_string(),
                        ))
                    })?;
                if new_amount < 0 {
                    return abort(AdmissionError::InsufficientCredits {
                        balance: balance.amount,
                        required: delta.unsigned_abs(),
                    });
                }

                balance.amount = new_amount as u64;
                balance.updated_at = now;
                balances.insert(&key[..], serde_json::to_vec(&balance).map_err(abort_codec)?)?;

                let entry = CreditTransaction {
                    id: txn_id,
                    owner_id,
                    kind: meta.kind,
                    amount: delta,
                    balance_after: balance.amount,
                    description: meta.description.clone(),
                    mission_id: meta.mission_id,
                    package_id: meta.package_id.clone(),
                    payment_ref: meta.payment_ref.clone(),
                    created_at: now,
                };
                txns.insert(&txn_key[..], serde_json::to_vec(&entry).map_err(abort_codec)?)?;

                Ok(balance.amount)
            });

        let new_balance = result.map_err(commit_err)?;
        self.db.flush().map_err(store_err)?;

        log::info!(
            "Ledger adjust: owner={} {:+} -> {} ({})",
            owner_id,
            delta,
            new_balance,
            meta.kind
        );
        Ok(new_balance)
    }

    /// One owner's transaction history, newest first.
    ///
    /// `page` is 1-based. Returns the page plus the owner's total entry
    /// count.
    pub fn list_transactions(
        &self,
        owner_id: u64,
        page: usize,
        page_size: usize,
    ) -> Result<(Vec<CreditTransaction>, usize), AdmissionError> {
        let prefix = key_u64(owner_id);
        let skip = page.saturating_sub(1).saturating_mul(page_size);

        let mut items = Vec::new();
        let mut total = 0usize;
        for entry in self.transactions.scan_prefix(&prefix[..]).rev() {
            let (_, raw) = entry.map_err(store_err)?;
            if total >= skip && items.len() < page_size {
                items.push(serde_json::from_slice(&raw).map_err(codec_err)?);
            }
            total += 1;
        }
        Ok((items, total))
    }

    /// First log entry of `kind` that references `mission_id`, if any.
    ///
    /// The compensation path uses this to keep refunds at most-once: a
    /// mission with a refund entry is never refunded again.
    pub fn find_mission_transaction(
        &self,
        owner_id: u64,
        mission_id: MissionId,
        kind: TransactionKind,
    ) -> Result<Option<CreditTransaction>, AdmissionError> {
        let prefix = key_u64(owner_id);
        for entry in self.transactions.scan_prefix(&prefix[..]) {
            let (_, raw) = entry.map_err(store_err)?;
            let txn: CreditTransaction = serde_json::from_slice(&raw).map_err(codec_err)?;
            if txn.kind == kind && txn.mission_id == Some(mission_id) {
                return Ok(Some(txn));
            }
        }
        Ok(None)
    }

    /// Insert catalog rows that do not exist yet. Already-stored rows are
    /// left untouched so operator edits survive a restart.
    pub fn seed_packages(&self, packages: &[CreditPackage]) -> Result<(), AdmissionError> {
        for pkg in packages {
            let bytes = serde_json::to_vec(pkg).map_err(codec_err)?;
            // Losing the race (or finding an existing row) is fine
            let _ = self
                .packages
                .compare_and_swap(pkg.id.as_bytes(), None::<&[u8]>, Some(bytes))
                .map_err(store_err)?;
        }
        self.db.flush().map_err(store_err)?;
        Ok(())
    }

    pub fn get_package(&self, package_id: &str) -> Result<Option<CreditPackage>, AdmissionError> {
        match self.packages.get(package_id.as_bytes()).map_err(store_err)? {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw).map_err(codec_err)?)),
            None => Ok(None),
        }
    }

    /// Active catalog entries in display order.
    pub fn list_packages(&self) -> Result<Vec<CreditPackage>, AdmissionError> {
        let mut packages = Vec::new();
        for entry in self.packages.iter() {
            let (_, raw) = entry.map_err(store_err)?;
            let pkg: CreditPackage = serde_json::from_slice(&raw).map_err(codec_err)?;
            if pkg.active {
                packages.push(pkg);
            }
        }
        packages.sort_by_key(|p| p.sort_order);
        Ok(packages)
    }

    /// Insert-if-absent balance row carrying the default grant.
    ///
    /// The row and its grant log entry commit in one transaction, so no
    /// interleaving can observe a granted balance without the entry or
    /// grant twice. Returns the row and whether this call created it.
    fn ensure_balance_locked(&self, owner_id: u64) -> Result<(Balance, bool), AdmissionError> {
        let key = key_u64(owner_id);
        let now = get_current_timestamp_ms();
        let grant = self.default_grant;
        let txn_id = generate_record_id();
        let txn_key = key_owner_record(owner_id, txn_id);

        let result: Result<(Balance, bool), TransactionError<AdmissionError>> =
            (&self.balances, &self.transactions).transaction(|(balances, txns)| {
                if let Some(raw) = balances.get(&key[..])? {
                    let balance: Balance =
                        serde_json::from_slice(&raw).map_err(abort_codec)?;
                    return Ok((balance, false));
                }

                let balance = Balance {
                    owner_id,
                    amount: grant,
                    created_at: now,
                    updated_at: now,
                };
                balances.insert(&key[..], serde_json::to_vec(&balance).map_err(abort_codec)?)?;

                if grant > 0 {
                    let entry = CreditTransaction {
                        id: txn_id,
                        owner_id,
                        kind: TransactionKind::Grant,
                        amount: grant as i64,
                        balance_after: grant,
                        description: WELCOME_GRANT_DESCRIPTION.to_string(),
                        mission_id: None,
                        package_id: None,
                        payment_ref: None,
                        created_at: now,
                    };
                    txns.insert(&txn_key[..], serde_json::to_vec(&entry).map_err(abort_codec)?)?;
                }

                Ok((balance, true))
            });

        let (balance, created) = result.map_err(commit_err)?;
        if created {
            self.db.flush().map_err(store_err)?;
            log::info!(
                "Granted {} welcome credits to owner {}",
                grant,
                owner_id
            );
        }
        Ok((balance, created))
    }
}

fn store_err(err: sled::Error) -> AdmissionError {
    AdmissionError::StoreUnavailable(err.to_string())
}

fn codec_err(err: serde_json::Error) -> AdmissionError {
    AdmissionError::Internal(format!("ledger codec: {}", err))
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
