// Metrics and monitoring for mission admission
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Metrics collector for the admission pipeline
#[derive(Default)]
pub struct AdmissionMetrics {
    // Counters
    submissions: AtomicU64,
    admitted: AtomicU64,
    insufficient_credits: AtomicU64,

    // Errors
    validation_errors: AtomicU64,
    store_errors: AtomicU64,
    queue_errors: AtomicU64,

    // Compensation
    rollbacks: AtomicU64,
    refunds: AtomicU64,
    refunds_pending: AtomicU64,
    refunds_redriven: AtomicU64,

    // Ledger top-ups
    purchases: AtomicU64,
    grants: AtomicU64,

    // Performance
    total_latency_ms: AtomicU64,
    max_latency_ms: AtomicU64,
}

impl AdmissionMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_submission(&self) {
        self.submissions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_admitted(&self) {
        self.admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_insufficient(&self) {
        self.insufficient_credits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_validation_error(&self) {
        self.validation_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_error(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_queue_error(&self) {
        self.queue_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Mission row deleted because the charge never committed
    pub fn record_rollback(&self) {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Charge compensated after a dispatch failure
    pub fn record_refund(&self) {
        self.refunds.fetch_add(1, Ordering::Relaxed);
    }

    /// Refund write failed; mission flagged for the sweeper
    pub fn record_refund_pending(&self) {
        self.refunds_pending.fetch_add(1, Ordering::Relaxed);
    }

    /// Sweeper committed a previously missing refund
    pub fn record_refund_redriven(&self) {
        self.refunds_redriven.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_purchase(&self) {
        self.purchases.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_grant(&self) {
        self.grants.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_latency(&self, latency_ms: u64) {
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);

        // Update max latency
        let mut current_max = self.max_latency_ms.load(Ordering::Relaxed);
        while latency_ms > current_max {
            match self.max_latency_ms.compare_exchange(
                current_max,
                latency_ms,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(new_max) => current_max = new_max,
            }
        }
    }

    pub fn get_snapshot(&self) -> MetricsSnapshot {
        let total = self.submissions.load(Ordering::Relaxed);
        let latency = self.total_latency_ms.load(Ordering::Relaxed);

        MetricsSnapshot {
            submissions: total,
            admitted: self.admitted.load(Ordering::Relaxed),
            insufficient_credits: self.insufficient_credits.load(Ordering::Relaxed),
            validation_errors: self.validation_errors.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
            queue_errors: self.queue_errors.load(Ordering::Relaxed),
            rollbacks: self.rollbacks.load(Ordering::Relaxed),
            refunds: self.refunds.load(Ordering::Relaxed),
            refunds_pending: self.refunds_pending.load(Ordering::Relaxed),
            refunds_redriven: self.refunds_redriven.load(Ordering::Relaxed),
            purchases: self.purchases.load(Ordering::Relaxed),
            grants: self.grants.load(Ordering::Relaxed),
            avg_latency_ms: if total > 0 { latency / total } else { 0 },
            max_latency_ms: self.max_latency_ms.load(Ordering::Relaxed),
            admit_rate: if total > 0 {
                (self.admitted.load(Ordering::Relaxed) as f64 / total as f64) * 100.0
            } else {
                0.0
            },
        }
    }

    pub fn reset(&self) {
        self.submissions.store(0, Ordering::Relaxed);
        self.admitted.store(0, Ordering::Relaxed);
        self.insufficient_credits.store(0, Ordering::Relaxed);
        self.validation_errors.store(0, Ordering::Relaxed);
        self.store_errors.store(0, Ordering::Relaxed);
        self.queue_errors.store(0, Ordering::Relaxed);
        self.rollbacks.store(0, Ordering::Relaxed);
        self.refunds.store(0, Ordering::Relaxed);
        self.refunds_pending.store(0, Ordering::Relaxed);
        self.refunds_redriven.store(0, Ordering::Relaxed);
        self.purchases.store(0, Ordering::Relaxed);
        self.grants.store(0, Ordering::Relaxed);
        self.total_latency_ms.store(0, Ordering::Relaxed);
        self.max_latency_ms.store(0, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub submissions: u64,
    pub admitted: u64,
    pub insufficient_credits: u64,
    pub validation_errors: u64,
    pub store_errors: u64,
    pub queue_errors: u64,
    pub rollbacks: u64,
    pub refunds: u64,
    pub refunds_pending: u64,
    pub refunds_redriven: u64,
    pub purchases: u64,
    pub grants: u64,
    pub avg_latency_ms: u64,
    pub max_latency_ms: u64,
    pub admit_rate: f64,
}

/// Timer for measuring operation latency
pub struct LatencyTimer {
    start: Instant,
}

impl LatencyTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}
