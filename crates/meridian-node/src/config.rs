//! Node configuration file management.

use std::path::PathBuf;

use meridian_types::{
    DEFAULT_MAX_PRICE_AGE_SECS, DEFAULT_SMOOTHED_HISTORY_LEN, DEFAULT_SMOOTHING_PPM, ONE_MILLION,
};
use serde::{Deserialize, Serialize};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "MERIDIAN_DATA_DIR";

/// Complete node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Price engine settings.
    #[serde(default)]
    pub oracle: OracleConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
}

/// Price engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Weight of each new index price in the smoothed price, in ppm.
    #[serde(default = "default_smoothing_ppm")]
    pub smoothing_ppm: u32,
    /// Smoothed samples kept per market.
    #[serde(default = "default_smoothed_history_len")]
    pub smoothed_history_len: usize,
    /// Oldest exchange observation still counted as fresh, in seconds.
    #[serde(default = "default_max_price_age_secs")]
    pub max_price_age_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace" | "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default value functions

fn default_smoothing_ppm() -> u32 {
    DEFAULT_SMOOTHING_PPM
}

fn default_smoothed_history_len() -> usize {
    DEFAULT_SMOOTHED_HISTORY_LEN
}

fn default_max_price_age_secs() -> u64 {
    DEFAULT_MAX_PRICE_AGE_SECS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            smoothing_ppm: default_smoothing_ppm(),
            smoothed_history_len: default_smoothed_history_len(),
            max_price_age_secs: default_max_price_age_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml_str(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: NodeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the price engine cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if u64::from(self.oracle.smoothing_ppm) > ONE_MILLION {
            anyhow::bail!(
                "oracle.smoothing_ppm must be at most {ONE_MILLION}, got {}",
                self.oracle.smoothing_ppm
            );
        }
        if self.oracle.smoothed_history_len == 0 {
            anyhow::bail!("oracle.smoothed_history_len must be greater than zero");
        }
        if self.oracle.max_price_age_secs == 0 {
            anyhow::bail!("oracle.max_price_age_secs must be greater than zero");
        }
        Ok(())
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if self.storage.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    /// Get the database file path.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir().join("meridian.db")
    }

    fn config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            return PathBuf::from(dir);
        }
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".meridian"))
            .unwrap_or_else(|_| PathBuf::from("/tmp/meridian"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert_eq!(config.oracle.smoothing_ppm, 300_000);
        assert_eq!(config.oracle.smoothed_history_len, 5);
        assert_eq!(config.oracle.max_price_age_secs, 30);
        assert_eq!(config.logging.log_level, "info");
        config.validate().expect("defaults are valid");
    }

    #[test]
    fn test_config_serialization() {
        let config = NodeConfig::default();
        let toml_str = toml::to_string(&config).expect("serialize");
        let parsed = NodeConfig::from_toml_str(&toml_str).expect("parse");
        assert_eq!(parsed.oracle.smoothing_ppm, config.oracle.smoothing_ppm);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = NodeConfig::from_toml_str(
            r#"
            [storage]
            data_dir = "/var/lib/meridian"

            [oracle]
            smoothing_ppm = 500000
            "#,
        )
        .expect("parse");
        assert_eq!(config.data_dir(), PathBuf::from("/var/lib/meridian"));
        assert_eq!(config.db_path(), PathBuf::from("/var/lib/meridian/meridian.db"));
        assert_eq!(config.oracle.smoothing_ppm, 500_000);
        assert_eq!(config.oracle.smoothed_history_len, 5);
        assert_eq!(config.logging.log_level, "info");
    }

    #[test]
    fn test_invalid_oracle_settings_rejected() {
        for doc in [
            "[oracle]\nsmoothing_ppm = 1000001",
            "[oracle]\nsmoothed_history_len = 0",
            "[oracle]\nmax_price_age_secs = 0",
        ] {
            assert!(NodeConfig::from_toml_str(doc).is_err(), "{doc}");
        }
        NodeConfig::from_toml_str("[oracle]\nsmoothing_ppm = 1000000").expect("upper bound inclusive");
    }
}
