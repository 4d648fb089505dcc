//! Refund sweeper
//!
//! Background reconciliation for the one crash window the admission saga
//! leaves open: a mission marked `refund_pending` whose refund never
//! committed. The sweeper re-drives those refunds through the same
//! at-most-once compensator path the live traffic uses, so running it
//! concurrently with admissions is safe.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use crate::admission::compensator::Compensator;
use crate::db::MissionDb;
use crate::metrics::AdmissionMetrics;

/// Sweeper configuration
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Scan interval (ms)
    pub scan_interval_ms: u64,
    /// Max flagged missions handled per scan
    pub batch_limit: usize,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            scan_interval_ms: 30000, // 30 seconds
            batch_limit: 100,
        }
    }
}

pub struct RefundSweeper {
    missions: Arc<MissionDb>,
    compensator: Compensator,
    metrics: Arc<AdmissionMetrics>,
    config: SweeperConfig,
}

impl RefundSweeper {
    pub fn new(
        missions: Arc<MissionDb>,
        compensator: Compensator,
        metrics: Arc<AdmissionMetrics>,
        config: SweeperConfig,
    ) -> Self {
        Self {
            missions,
            compensator,
            metrics,
            config,
        }
    }

    /// One scan pass. Returns how many refunds this pass committed.
    pub fn sweep_once(&self) -> usize {
        let pending = match self.missions.list_refund_pending(self.config.batch_limit) {
            Ok(pending) => pending,
            Err(e) => {
                log::error!("Refund sweep scan failed: {}", e);
                return 0;
            }
        };

        if !pending.is_empty() {
            log::info!("Refund sweep found {} pending missions", pending.len());
        }

        let mut committed = 0;
        for mission in pending {
            match self.compensator.redrive_refund(&mission) {
                Ok(true) => {
                    committed += 1;
                    self.metrics.record_refund_redriven();
                }
                Ok(false) => {
                    // Refund was already on the ledger; only the flag
                    // needed clearing
                    log::info!("Mission {} refund already committed, flag cleared", mission.id);
                }
                Err(e) => {
                    // Flag stays set; next scan retries
                    log::warn!("Refund re-drive for mission {} failed: {} (will retry)", mission.id, e);
                }
            }
        }
        committed
    }

    /// Run the sweep loop.
    pub async fn run(&self) {
        log::info!(
            "Refund sweeper started (scan_interval={}ms, batch_limit={})",
            self.config.scan_interval_ms,
            self.config.batch_limit
        );

        loop {
            // 1. Re-drive everything currently flagged
            self.sweep_once();

            // 2. Sleep before next scan
            sleep(Duration::from_millis(self.config.scan_interval_ms)).await;
        }
    }

    /// Start the sweeper in a background task
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweeper_config_defaults() {
        let config = SweeperConfig::default();

        assert_eq!(config.scan_interval_ms, 30000);
        assert_eq!(config.batch_limit, 100);
    }
}
