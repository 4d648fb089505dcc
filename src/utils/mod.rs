pub mod request_id;

pub use request_id::{generate_record_id, record_timestamp_ms};
