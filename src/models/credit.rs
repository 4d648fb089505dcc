//! Credit ledger domain types
//!
//! Credits are whole, indivisible units (no fractional credits), so every
//! amount is plain integer arithmetic. Balances never go negative; the
//! transaction log is append-only and each entry records the balance the
//! commit left behind.

use serde::{Deserialize, Serialize};

use super::mission::MissionId;

/// Description used for the automatic first-access grant
pub const WELCOME_GRANT_DESCRIPTION: &str = "Welcome grant";

/// Ledger entry classification
///
/// Uses strum for automatic String conversion:
/// - `kind.as_ref()` -> &str "refund" (zero-alloc)
/// - `kind.to_string()` -> String "refund"
/// - `TransactionKind::from_str("refund")` -> Result<TransactionKind>
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TransactionKind {
    /// Credits bought through a package (amount > 0)
    Purchase,
    /// Mission admission charge (amount < 0)
    Deduction,
    /// Compensation for a mission that never dispatched (amount > 0)
    Refund,
    /// Administrative or first-access credit (amount > 0)
    Grant,
}

/// A single owner's prepaid balance row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Balance {
    pub owner_id: u64,
    /// Available credits; the store never commits a negative value
    pub amount: u64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Append-only ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditTransaction {
    #[serde(with = "super::serde_utils")]
    pub id: u64,
    pub owner_id: u64,
    pub kind: TransactionKind,
    /// Signed credit delta: positive adds, negative spends
    pub amount: i64,
    /// Balance after this entry committed
    pub balance_after: u64,
    pub description: String,
    /// Mission this entry charged or refunded, if any
    pub mission_id: Option<MissionId>,
    /// Package bought, for purchase entries
    pub package_id: Option<String>,
    /// Payment processor reference, for purchase entries
    pub payment_ref: Option<String>,
    pub created_at: i64,
}

/// A purchasable credit bundle from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditPackage {
    pub id: String,
    pub name: String,
    pub description: String,
    pub credits: u64,
    /// Price in cents to avoid float money
    pub price_cents: u64,
    /// Inactive packages stay stored but cannot be bought
    pub active: bool,
    pub sort_order: u32,
}

/// Built-in catalog, seeded insert-if-absent at startup so operator edits
/// to the stored rows survive restarts.
pub fn default_packages() -> Vec<CreditPackage> {
    vec![
        CreditPackage {
            id: "starter".to_string(),
            name: "Starter".to_string(),
            description: "Entry pack for short forecasts".to_string(),
            credits: 100,
            price_cents: 999,
            active: true,
            sort_order: 1,
        },
        CreditPackage {
            id: "search".to_string(),
            name: "Search".to_string(),
            description: "Standard pack for multi-day searches".to_string(),
            credits: 500,
            price_cents: 3999,
            active: true,
            sort_order: 2,
        },
        CreditPackage {
            id: "operation".to_string(),
            name: "Operation".to_string(),
            description: "Large pack for sustained operations".to_string(),
            credits: 2000,
            price_cents: 12999,
            active: true,
            sort_order: 3,
        },
    ]
}

/// Everything about a ledger adjustment except the delta itself.
#[derive(Debug, Clone)]
pub struct TransactionMeta {
    pub kind: TransactionKind,
    pub description: String,
    pub mission_id: Option<MissionId>,
    pub package_id: Option<String>,
    pub payment_ref: Option<String>,
}

impl TransactionMeta {
    pub fn deduction(description: String, mission_id: MissionId) -> Self {
        Self {
            kind: TransactionKind::Deduction,
            description,
            mission_id: Some(mission_id),
            package_id: None,
            payment_ref: None,
        }
    }

    pub fn refund(description: String, mission_id: MissionId) -> Self {
        Self {
            kind: TransactionKind::Refund,
            description,
            mission_id: Some(mission_id),
            package_id: None,
            payment_ref: None,
        }
    }

    pub fn purchase(description: String, package_id: String, payment_ref: String) -> Self {
        Self {
            kind: TransactionKind::Purchase,
            description,
            mission_id: None,
            package_id: Some(package_id),
            payment_ref: Some(payment_ref),
        }
    }

    pub fn grant(description: String) -> Self {
        Self {
            kind: TransactionKind::Grant,
            description,
            mission_id: None,
            package_id: None,
            payment_ref: None,
        }
    }
}

/// Payment processor outcome attached to a purchase request.
///
/// The gateway never talks to the processor itself; the caller asserts the
/// payment succeeded and passes the processor's reference through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub confirmed: bool,
    pub payment_ref: String,
}

/// Result of a committed purchase or grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub credits_added: u64,
    pub new_balance: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    // ===== TransactionKind Tests =====

    #[test]
    fn test_kind_as_ref() {
        assert_eq!(TransactionKind::Purchase.as_ref(), "purchase");
        assert_eq!(TransactionKind::Deduction.as_ref(), "deduction");
        assert_eq!(TransactionKind::Refund.as_ref(), "refund");
        assert_eq!(TransactionKind::Grant.as_ref(), "grant");
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!(
            TransactionKind::from_str("refund").unwrap(),
            TransactionKind::Refund
        );
        assert!(TransactionKind::from_str("gift").is_err());
    }

    #[test]
    fn test_kind_serde_lowercase() {
        let json = serde_json::to_string(&TransactionKind::Deduction).unwrap();
        assert_eq!(json, "\"deduction\"");

        let back: TransactionKind = serde_json::from_str("\"grant\"").unwrap();
        assert_eq!(back, TransactionKind::Grant);
    }

    // ===== Transaction Serialization =====

    #[test]
    fn test_transaction_id_serializes_as_string() {
        let txn = CreditTransaction {
            id: 9007199254740993, // above 2^53, breaks f64-based JSON readers
            owner_id: 4001,
            kind: TransactionKind::Deduction,
            amount: -11,
            balance_after: 4,
            description: "test".to_string(),
            mission_id: Some(MissionId::new(7)),
            package_id: None,
            payment_ref: None,
            created_at: 0,
        };

        let json = serde_json::to_string(&txn).unwrap();
        assert!(json.contains("\"id\":\"9007199254740993\""));
        assert!(json.contains("\"mission_id\":\"7\""));

        let back: CreditTransaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, 9007199254740993);
        assert_eq!(back.amount, -11);
    }

    // ===== Catalog Tests =====

    #[test]
    fn test_default_packages_well_formed() {
        let packages = default_packages();
        assert_eq!(packages.len(), 3);

        let mut ids = std::collections::HashSet::new();
        for pkg in &packages {
            assert!(pkg.active);
            assert!(pkg.credits > 0);
            assert!(pkg.price_cents > 0);
            assert!(ids.insert(pkg.id.clone()), "duplicate package id");
        }
    }

    #[test]
    fn test_default_packages_sorted() {
        let packages = default_packages();
        for pair in packages.windows(2) {
            assert!(pair[0].sort_order < pair[1].sort_order);
        }
    }
}
