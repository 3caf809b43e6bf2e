//! CLI configuration management

use anyhow::{Context, Result};
use hookscope_common::constants;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Environment variable overriding the server URL
pub const SERVER_ENV: &str = "HOOKSCOPE_SERVER";

/// Invalid configuration values
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Server URL must start with http:// or https://, got {0:?}")]
    InvalidServerUrl(String),

    #[error("Page size must be between 1 and {max}, got {0}", max = constants::MAX_PAGE_SIZE)]
    InvalidPageSize(u32),

    #[error("Reconnect delay must be at least 100 ms, got {0}")]
    InvalidReconnectDelay(u64),
}

/// Get the configuration directory path
pub fn config_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hookscope")
    }

    #[cfg(not(target_os = "windows"))]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".hookscope")
    }
}

/// Get the config file path
pub fn config_file() -> PathBuf {
    config_dir().join("config.yml")
}

/// Get the logs directory
pub fn logs_dir() -> PathBuf {
    config_dir().join("logs")
}

/// Log file used while the dashboard owns the terminal
pub fn log_file() -> PathBuf {
    logs_dir().join("hookscope.log")
}

/// Ensure all config directories exist
pub fn ensure_dirs() -> Result<()> {
    fs::create_dir_all(config_dir()).context("Failed to create config directory")?;
    fs::create_dir_all(logs_dir()).context("Failed to create logs directory")?;
    Ok(())
}

/// Main configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Webhook-tester server (default: http://localhost:9847)
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Requests fetched per snapshot
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Wait between a dropped live stream and the next attempt
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

fn default_server_url() -> String {
    format!("http://localhost:{}", constants::DEFAULT_SERVER_PORT)
}

fn default_page_size() -> u32 {
    constants::DEFAULT_PAGE_SIZE
}

fn default_reconnect_delay_ms() -> u64 {
    constants::RECONNECT_DELAY_MS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            page_size: default_page_size(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
        }
    }
}

impl Config {
    /// Load config from file
    pub fn load() -> Result<Self> {
        let path = config_file();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        Self::from_yaml(&content)
    }

    /// Load config from file, then apply the env var and `--server` flag
    pub fn resolve(server: Option<String>) -> Result<Self> {
        let mut config = Self::load()?;

        let server = server.or_else(|| std::env::var(SERVER_ENV).ok().filter(|s| !s.is_empty()));
        if let Some(url) = server {
            tracing::debug!("Server URL overridden: {}", url);
            config.server_url = url;
        }

        config.validate()?;
        Ok(config)
    }

    fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        self.validate()?;
        ensure_dirs()?;
        let path = config_file();
        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;
        fs::write(&path, content).context("Failed to write config file")?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            return Err(ConfigError::InvalidServerUrl(self.server_url.clone()));
        }
        if self.page_size == 0 || self.page_size > constants::MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidPageSize(self.page_size));
        }
        if self.reconnect_delay_ms < 100 {
            return Err(ConfigError::InvalidReconnectDelay(self.reconnect_delay_ms));
        }
        Ok(())
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server_url, "http://localhost:9847");
        assert_eq!(config.page_size, 50);
        assert_eq!(config.reconnect_delay(), Duration::from_secs(3));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config = Config::from_yaml("server_url: https://hooks.example.com\n").unwrap();
        assert_eq!(config.server_url, "https://hooks.example.com");
        assert_eq!(config.page_size, 50);
        assert_eq!(config.reconnect_delay_ms, 3000);

        assert!(Config::from_yaml("page_size: [oops").is_err());
    }

    #[test]
    fn test_validation() {
        let config = Config {
            server_url: "localhost:9847".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidServerUrl("localhost:9847".to_string()))
        );

        let config = Config {
            page_size: 101,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidPageSize(101)));

        let config = Config {
            reconnect_delay_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidReconnectDelay(0)));
    }
}
