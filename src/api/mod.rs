pub mod admin;
pub mod credits;
pub mod missions;
pub mod response;
pub mod router;

pub use response::*;
pub use router::*;
