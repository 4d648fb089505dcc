pub mod ledger_db;
pub mod mission_db;

pub use ledger_db::{acquire_owner_lock, LedgerDb};
pub use mission_db::MissionDb;
