use serde::Deserialize;
use std::time::Duration;
use validator::Validate;

use crate::domain::policy::PolicyLimits;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub policy: PolicyLimits,
    #[serde(default)]
    pub receipts: ReceiptsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReceiptsConfig {
    #[serde(default = "default_extractor_provider")]
    pub provider: String,
    #[serde(default = "default_extract_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_max_receipt_size")]
    pub max_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

impl Default for ReceiptsConfig {
    fn default() -> Self {
        Self {
            provider: default_extractor_provider(),
            delay_ms: default_extract_delay_ms(),
            max_bytes: default_max_receipt_size(),
        }
    }
}

impl ReceiptsConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Config {
    /// Reads `config.{toml,yaml,json}` from the working directory when present,
    /// then `EXPENSES__SECTION__KEY` environment overrides.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::load("config")
    }

    pub fn load(file: &str) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(file).required(false))
            .add_source(
                config::Environment::with_prefix("EXPENSES")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("app.cors_origins")
                    .try_parsing(true),
            );
        let cfg = builder.build()?;
        let config: Config = cfg.try_deserialize()?;

        config
            .policy
            .validate()
            .map_err(|e| config::ConfigError::Message(format!("invalid policy limits: {e}")))?;

        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.app.host, self.app.port)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_extractor_provider() -> String {
    "mock".to_string()
}

fn default_extract_delay_ms() -> u64 {
    1_500
}

fn default_max_receipt_size() -> usize {
    5 * 1024 * 1024
}

#[cfg(test)]
mod tests {
    use super::Config;
    use config::ConfigError;
    use serial_test::serial;
    use std::{env, io::Write};

    fn clear_env_vars() {
        env::remove_var("EXPENSES__APP__PORT");
        env::remove_var("EXPENSES__POLICY__STALE_AFTER_DAYS");
        env::remove_var("EXPENSES__POLICY__TIP_LIMIT_PERCENT");
        env::remove_var("EXPENSES__POLICY__LODGING_RATE_CEILING_CENTS");
        env::remove_var("EXPENSES__POLICY__MIN_DESCRIPTION_CHARS");
        env::remove_var("EXPENSES__RECEIPTS__PROVIDER");
    }

    #[test]
    #[serial]
    fn defaults_apply_without_any_source() {
        clear_env_vars();

        let config = Config::load("does-not-exist").expect("expected configuration to load");

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.policy.stale_after_days, 60);
        assert_eq!(config.policy.lodging_rate_ceiling_cents, 35_000);
        assert_eq!(config.receipts.provider, "mock");
        assert_eq!(config.receipts.max_bytes, 5 * 1024 * 1024);
    }

    #[test]
    #[serial]
    fn environment_overrides_policy_limits() {
        clear_env_vars();
        env::set_var("EXPENSES__APP__PORT", "9090");
        env::set_var("EXPENSES__POLICY__STALE_AFTER_DAYS", "45");

        let config = Config::load("does-not-exist").expect("expected configuration to load");

        assert_eq!(config.app.port, 9090);
        assert_eq!(config.policy.stale_after_days, 45);
        assert_eq!(config.policy.min_description_chars, 10);

        clear_env_vars();
    }

    #[test]
    #[serial]
    fn reads_config_file() {
        clear_env_vars();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("policy.toml");
        let mut file = std::fs::File::create(&path).expect("create config file");
        writeln!(
            file,
            "[policy]\nlodging_rate_ceiling_cents = 40000\n\n[receipts]\ndelay_ms = 0"
        )
        .expect("write config file");

        let config = Config::load(path.to_str().expect("utf-8 path"))
            .expect("expected configuration to load");

        assert_eq!(config.policy.lodging_rate_ceiling_cents, 40_000);
        assert_eq!(config.receipts.delay_ms, 0);
        assert_eq!(config.receipts.provider, "mock");
    }

    #[test]
    #[serial]
    fn rejects_non_positive_tip_limit() {
        clear_env_vars();
        env::set_var("EXPENSES__POLICY__TIP_LIMIT_PERCENT", "0");

        let error = Config::load("does-not-exist").expect_err("expected configuration to fail");

        match error {
            ConfigError::Message(message) => assert!(message.contains("tip_limit_percent")),
            other => panic!("unexpected error: {:?}", other),
        }

        clear_env_vars();
    }

    #[test]
    #[serial]
    fn rejects_negative_money_limits() {
        clear_env_vars();
        env::set_var("EXPENSES__POLICY__LODGING_RATE_CEILING_CENTS", "-1");

        let error = Config::load("does-not-exist").expect_err("expected configuration to fail");

        match error {
            ConfigError::Message(message) => {
                assert!(message.contains("lodging_rate_ceiling_cents"))
            }
            other => panic!("unexpected error: {:?}", other),
        }

        clear_env_vars();
    }

    #[test]
    #[serial]
    fn rejects_zero_description_length() {
        clear_env_vars();
        env::set_var("EXPENSES__POLICY__MIN_DESCRIPTION_CHARS", "0");

        let error = Config::load("does-not-exist").expect_err("expected configuration to fail");
        assert!(matches!(error, ConfigError::Message(_)));

        clear_env_vars();
    }
}
