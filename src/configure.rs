use config::{Config, ConfigError, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub listen_addr: String,
    pub data_dir: String,
    pub log_dir: String,
    /// Token for the privileged endpoints; empty disables them
    pub admin_token: String,
    /// Credits granted on an owner's first ledger access
    pub default_grant: u64,
    /// Dispatch queue capacity; a full queue rejects admissions
    pub queue_capacity: usize,
    /// Per-owner ledger lock acquisition timeout (ms)
    pub lock_timeout_ms: u64,
    /// Refund sweeper scan interval (ms)
    pub sweep_interval_ms: u64,
    /// Max refund-pending missions handled per sweep
    pub sweep_batch_limit: usize,
}

pub fn load_config() -> Result<AppConfig, ConfigError> {
    build_config("config/config.yaml", "APP")
}

/// Config assembled from explicit sources. Tests point this at a file
/// that does not exist and an env prefix nothing sets, so the checkout's
/// own `config/` and `APP_` variables never leak in.
fn build_config(file: &str, env_prefix: &str) -> Result<AppConfig, ConfigError> {
    let s = Config::builder()
        // Set defaults
        .set_default("listen_addr", "0.0.0.0:8080")?
        .set_default("data_dir", "data/driftgate")?
        .set_default("log_dir", "logs")?
        .set_default("admin_token", "")?
        .set_default("default_grant", 100)?
        .set_default("queue_capacity", 10000)?
        .set_default("lock_timeout_ms", 5000)?
        .set_default("sweep_interval_ms", 30000)?
        .set_default("sweep_batch_limit", 100)?
        // Add configuration from a file (optional)
        .add_source(File::with_name(file).required(false))
        // Add configuration from environment variables
        .add_source(config::Environment::with_prefix(env_prefix))
        .build()?;

    s.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn isolated_config(dir: &TempDir, env_prefix: &str) -> Result<AppConfig, ConfigError> {
        let file = dir.path().join("config.yaml");
        build_config(file.to_str().unwrap(), env_prefix)
    }

    #[test]
    fn test_defaults() {
        let tmp_dir = TempDir::new().unwrap();
        let config = isolated_config(&tmp_dir, "DRIFTGATE_TEST_DEFAULTS").unwrap();

        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.default_grant, 100);
        assert_eq!(config.queue_capacity, 10000);
        assert_eq!(config.lock_timeout_ms, 5000);
        assert!(config.admin_token.is_empty());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let tmp_dir = TempDir::new().unwrap();
        std::fs::write(
            tmp_dir.path().join("config.yaml"),
            "listen_addr: \"127.0.0.1:9999\"\ndefault_grant: 25\n",
        )
        .unwrap();
        let config = isolated_config(&tmp_dir, "DRIFTGATE_TEST_OVERRIDES").unwrap();

        assert_eq!(config.listen_addr, "127.0.0.1:9999");
        assert_eq!(config.default_grant, 25);
        // Untouched keys keep their defaults
        assert_eq!(config.lock_timeout_ms, 5000);
    }
}
