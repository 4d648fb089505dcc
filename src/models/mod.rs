pub use admission_errors::*;
pub use api_response::*;
pub use credit::*;
pub use mission::*;

pub mod admission_errors;
pub mod api_response;
pub mod credit;
pub mod mission;
pub mod serde_utils;
