use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

use crate::pattern::VanityPattern;

/// Valid BIP39 mnemonic lengths
const MNEMONIC_WORD_COUNTS: [usize; 5] = [12, 15, 18, 21, 24];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub search: SearchConfig,
    pub pattern: VanityPattern,
    #[serde(default)]
    pub derivation: DerivationConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// How many matching wallets to collect before stopping
    pub target_count: u64,

    /// Parallel search threads
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Loop iterations between shared-counter flushes and termination checks
    #[serde(default = "default_batch_size")]
    pub attempt_batch_size: u64,

    /// Bounded result channel capacity (backpressure for a slow collector)
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Collector receive timeout between worker liveness checks (ms)
    #[serde(default = "default_recv_timeout_ms")]
    pub recv_timeout_ms: u64,

    /// How long to wait for workers after the cooperative stop signal (ms)
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,

    /// Consecutive derivation failures after which a worker gives up
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
}

impl SearchConfig {
    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivationConfig {
    /// Phantom-compatible Solana path; every component must be hardened
    #[serde(default = "default_derivation_path")]
    pub derivation_path: String,

    /// BIP39 mnemonic length (12, 15, 18, 21 or 24 words)
    #[serde(default = "default_word_count")]
    pub word_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Destination for the Address/Mnemonic CSV
    #[serde(default = "default_csv_path")]
    pub csv_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Seconds between progress reports
    #[serde(default = "default_progress_interval")]
    pub interval_secs: u64,
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

fn default_batch_size() -> u64 {
    1000
}

fn default_channel_capacity() -> usize {
    100
}

fn default_recv_timeout_ms() -> u64 {
    2000
}

fn default_shutdown_grace_ms() -> u64 {
    5000
}

fn default_max_consecutive_failures() -> u32 {
    100
}

fn default_derivation_path() -> String {
    "m/44'/501'/0'/0'".to_string()
}

fn default_word_count() -> usize {
    24
}

fn default_csv_path() -> String {
    "sol-w-import.csv".to_string()
}

fn default_progress_interval() -> u64 {
    10
}

impl Default for DerivationConfig {
    fn default() -> Self {
        Self {
            derivation_path: default_derivation_path(),
            word_count: default_word_count(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_path: default_csv_path(),
        }
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_progress_interval(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content)
            .context("Failed to parse TOML config")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.search.target_count == 0 {
            bail!("search.target_count must be greater than 0");
        }

        if self.search.worker_count == 0 {
            bail!("search.worker_count must be greater than 0");
        }
        if self.search.worker_count > 1024 {
            bail!("search.worker_count is too high (>{})", 1024);
        }

        if self.search.attempt_batch_size == 0 {
            bail!("search.attempt_batch_size must be greater than 0");
        }

        if self.search.channel_capacity == 0 {
            bail!("search.channel_capacity must be greater than 0");
        }

        if self.search.recv_timeout_ms == 0 {
            bail!("search.recv_timeout_ms must be greater than 0");
        }

        if self.search.max_consecutive_failures == 0 {
            bail!("search.max_consecutive_failures must be greater than 0");
        }

        self.pattern.validate()?;

        if !MNEMONIC_WORD_COUNTS.contains(&self.derivation.word_count) {
            bail!(
                "derivation.word_count must be one of {:?}",
                MNEMONIC_WORD_COUNTS
            );
        }

        if let Err(e) = crate::wallet::parse_derivation_path(&self.derivation.derivation_path) {
            bail!("derivation.derivation_path is invalid: {}", e);
        }

        if self.output.csv_path.is_empty() {
            bail!("output.csv_path must not be empty");
        }

        if self.progress.interval_secs == 0 {
            bail!("progress.interval_secs must be greater than 0");
        }

        Ok(())
    }

    /// Create default configuration
    pub fn default_toml() -> String {
        format!(
            r#"[search]
# How many matching wallets to collect before stopping
target_count = 2
# Parallel search threads (defaults to the number of logical CPUs)
worker_count = {workers}
# Loop iterations between shared-counter flushes and termination checks
attempt_batch_size = 1000
# Bounded result channel capacity (backpressure for a slow collector)
channel_capacity = 100
recv_timeout_ms = 2000
shutdown_grace_ms = 5000
max_consecutive_failures = 100

[pattern]
# "prefix" matches a literal case-insensitively; "lowercase"/"uppercase"
# match a run of N letters and take `length` instead of `value`
mode = "prefix"
value = "test"

[derivation]
# Phantom-compatible Solana path; every component must be hardened
derivation_path = "m/44'/501'/0'/0'"
# BIP39 mnemonic length: 12, 15, 18, 21 or 24 words
word_count = 24

[output]
csv_path = "sol-w-import.csv"

[progress]
interval_secs = 10
"#,
            workers = default_worker_count()
        )
    }

    /// Save default config to file
    pub fn save_default(path: &str) -> Result<()> {
        fs::write(path, Self::default_toml())
            .context("Failed to write default config")?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            search: SearchConfig {
                target_count: 2,
                worker_count: default_worker_count(),
                attempt_batch_size: default_batch_size(),
                channel_capacity: default_channel_capacity(),
                recv_timeout_ms: default_recv_timeout_ms(),
                shutdown_grace_ms: default_shutdown_grace_ms(),
                max_consecutive_failures: default_max_consecutive_failures(),
            },
            pattern: VanityPattern::Prefix {
                value: "test".to_string(),
            },
            derivation: DerivationConfig::default(),
            output: OutputConfig::default(),
            progress: ProgressConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.search.target_count, 2);
        assert_eq!(config.derivation.derivation_path, "m/44'/501'/0'/0'");
    }

    #[test]
    fn test_default_toml_parses_and_validates() {
        let config: Config = toml::from_str(&Config::default_toml()).unwrap();
        assert!(config.validate().is_ok());
        assert!(matches!(config.pattern, VanityPattern::Prefix { .. }));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.search.target_count, config.search.target_count);
        assert_eq!(parsed.output.csv_path, config.output.csv_path);
    }

    #[test]
    fn test_validate_rejects_zero_target() {
        let mut config = Config::default();
        config.search.target_count = 0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("target_count"), "got err: {}", err);
    }

    #[test]
    fn test_validate_rejects_zero_channel_capacity() {
        let mut config = Config::default();
        config.search.channel_capacity = 0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("channel_capacity"), "got err: {}", err);
    }

    #[test]
    fn test_validate_rejects_bad_word_count() {
        let mut config = Config::default();
        config.derivation.word_count = 13;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("word_count"), "got err: {}", err);
    }

    #[test]
    fn test_validate_rejects_non_hardened_derivation_path() {
        let mut config = Config::default();
        config.derivation.derivation_path = "m/44'/501'/0/0".to_string();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("derivation_path"), "got err: {}", err);
    }

    #[test]
    fn test_validate_rejects_impossible_pattern() {
        let mut config = Config::default();
        config.pattern = VanityPattern::Prefix {
            value: "0xabc".to_string(),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_minimal_config_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [search]
            target_count = 1

            [pattern]
            mode = "lowercase"
            length = 3
            "#,
        )
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.search.attempt_batch_size, 1000);
        assert_eq!(config.search.channel_capacity, 100);
        assert_eq!(config.output.csv_path, "sol-w-import.csv");
    }
}
