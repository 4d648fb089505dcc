//! Credit purchases and privileged grants
//!
//! Both paths are thin wrappers over the ledger's `adjust`: the catalog
//! row supplies the credit amount, the payment processor result gates the
//! commit. This module never talks to the processor itself; the caller
//! asserts the payment outcome.

use std::sync::Arc;

use crate::db::LedgerDb;
use crate::metrics::AdmissionMetrics;
use crate::models::{AdmissionError, PaymentConfirmation, PurchaseReceipt, TransactionMeta};

pub struct PurchaseHandler {
    ledger: Arc<LedgerDb>,
    metrics: Arc<AdmissionMetrics>,
}

impl PurchaseHandler {
    pub fn new(ledger: Arc<LedgerDb>, metrics: Arc<AdmissionMetrics>) -> Self {
        Self { ledger, metrics }
    }

    /// Credit a purchased package to the owner's balance.
    ///
    /// The ledger is only touched once the payment is confirmed; every
    /// rejection before that leaves no trace.
    pub fn purchase(
        &self,
        owner_id: u64,
        package_id: &str,
        payment: &PaymentConfirmation,
    ) -> Result<PurchaseReceipt, AdmissionError> {
        // 1. Package must exist and be purchasable
        let package = self
            .ledger
            .get_package(package_id)?
            .ok_or_else(|| AdmissionError::PackageNotFound(package_id.to_string()))?;
        if !package.active {
            return Err(AdmissionError::PackageInactive(package_id.to_string()));
        }

        // 2. Payment must have gone through
        if !payment.confirmed {
            return Err(AdmissionError::PaymentNotConfirmed);
        }

        // 3. Commit the credits
        let meta = TransactionMeta::purchase(
            format!("Purchased {} ({} credits)", package.name, package.credits),
            package.id.clone(),
            payment.payment_ref.clone(),
        );
        let new_balance = self.ledger.adjust(owner_id, package.credits as i64, meta)?;

        self.metrics.record_purchase();
        log::info!(
            "Owner {} purchased package {} for {} credits (balance now {})",
            owner_id,
            package.id,
            package.credits,
            new_balance
        );

        Ok(PurchaseReceipt {
            credits_added: package.credits,
            new_balance,
        })
    }

    /// Credit an owner outside the catalog. The HTTP surface gates this
    /// behind the admin token; the operation itself trusts its caller.
    pub fn grant(
        &self,
        owner_id: u64,
        amount: i64,
        description: &str,
    ) -> Result<PurchaseReceipt, AdmissionError> {
        if amount <= 0 {
            return Err(AdmissionError::InvalidGrantAmount(amount));
        }

        let meta = TransactionMeta::grant(description.to_string());
        let new_balance = self.ledger.adjust(owner_id, amount, meta)?;

        self.metrics.record_grant();
        log::warn!(
            "ADMIN ACTION: granted {} credits to owner {} (balance now {}): {}",
            amount,
            owner_id,
            new_balance,
            description
        );

        Ok(PurchaseReceipt {
            credits_added: amount as u64,
            new_balance,
        })
    }
}
