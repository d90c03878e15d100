//! Configuration management for powledger

use crate::error::ChainError;
use crate::miner::{DEFAULT_DIFFICULTY, MAX_DIFFICULTY};
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub mining: MiningConfig,
    #[serde(default)]
    pub consensus: ConsensusConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    #[serde(default)]
    pub bootstrap_peers: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            api_port: default_api_port(),
            bootstrap_peers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MiningConfig {
    #[serde(default = "default_difficulty")]
    pub difficulty: usize,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConsensusConfig {
    /// Seconds between background resolution passes; 0 disables the loop.
    #[serde(default = "default_resolve_interval")]
    pub resolve_interval_secs: u64,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            resolve_interval_secs: default_resolve_interval(),
            fetch_timeout_secs: default_fetch_timeout(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ChainError> {
        if self.mining.difficulty == 0 || self.mining.difficulty > MAX_DIFFICULTY {
            return Err(ChainError::ConfigError(format!(
                "mining.difficulty must be between 1 and {}, got {}",
                MAX_DIFFICULTY, self.mining.difficulty
            )));
        }

        if self.consensus.max_concurrent_fetches == 0 {
            return Err(ChainError::ConfigError(
                "consensus.max_concurrent_fetches must be at least 1".to_string(),
            ));
        }

        if self.consensus.fetch_timeout_secs == 0 {
            return Err(ChainError::ConfigError(
                "consensus.fetch_timeout_secs must be at least 1".to_string(),
            ));
        }

        self.log_level()?;
        Ok(())
    }

    pub fn log_level(&self) -> Result<tracing::Level, ChainError> {
        self.logging.level.parse().map_err(|_| {
            ChainError::ConfigError(format!("unknown logging.level '{}'", self.logging.level))
        })
    }
}

/// Load `config.toml` from the working directory, falling back to defaults when absent.
pub fn load_config() -> Result<Config, ChainError> {
    if Path::new(DEFAULT_CONFIG_PATH).exists() {
        load_config_from(DEFAULT_CONFIG_PATH)
    } else {
        Ok(Config::default())
    }
}

pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config, ChainError> {
    let config_str = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&config_str)?;
    config.validate()?;
    Ok(config)
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    5000
}

fn default_difficulty() -> usize {
    DEFAULT_DIFFICULTY
}

fn default_resolve_interval() -> u64 {
    30
}

fn default_fetch_timeout() -> u64 {
    5
}

fn default_max_concurrent_fetches() -> usize {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.mining.difficulty, 4);
        assert_eq!(config.network.api_port, 5000);
        assert_eq!(config.log_level().unwrap(), tracing::Level::INFO);
    }

    #[test]
    fn test_load_partial_file() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(
            file,
            "[network]\napi_port = 6001\nbootstrap_peers = [\"10.0.0.5:8000\"]\n\n[mining]\ndifficulty = 3"
        )?;

        let config = load_config_from(file.path())?;
        assert_eq!(config.network.api_port, 6001);
        assert_eq!(config.network.bind_address, "0.0.0.0");
        assert_eq!(config.network.bootstrap_peers, vec!["10.0.0.5:8000"]);
        assert_eq!(config.mining.difficulty, 3);
        assert_eq!(config.consensus.max_concurrent_fetches, 8);
        Ok(())
    }

    #[test]
    fn test_rejects_invalid_values() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "[mining]\ndifficulty = 0")?;
        assert!(matches!(
            load_config_from(file.path()),
            Err(ChainError::ConfigError(_))
        ));

        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "[logging]\nlevel = \"loud\"")?;
        assert!(matches!(
            load_config_from(file.path()),
            Err(ChainError::ConfigError(_))
        ));
        Ok(())
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            load_config_from("/definitely/not/here.toml"),
            Err(ChainError::IoError(_))
        ));
    }
}
