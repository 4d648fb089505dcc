//! Admission module - main module file
//!
//! Everything between a submit request and a queued job: parameter
//! validation, cost calculation, the charge-then-dispatch saga with its
//! compensation paths, purchases, and the background refund sweeper.

pub mod compensator;
pub mod controller;
pub mod cost;
pub mod purchase;
pub mod sweeper;
pub mod validator;

// Re-export commonly used types
pub use compensator::{Compensator, RefundOutcome};
pub use controller::AdmissionController;
pub use cost::mission_cost;
pub use purchase::PurchaseHandler;
pub use sweeper::{RefundSweeper, SweeperConfig};
pub use validator::validate_mission_params;
