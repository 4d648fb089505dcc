pub mod admission;
pub mod api;
pub mod common_utils;
pub mod configure;
pub mod db;
pub mod dispatch;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod utils;
