//! Configuration module for symnotify
//!
//! This module provides configuration structures and loading mechanisms.
//! Configuration can be loaded from TOML files and/or environment variables.

mod defaults;
mod loading;


use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use defaults::*;

/// Returns the path to the global configuration file
///
/// The global config is stored at `~/.symnotify/config.toml`.
pub fn global_config_path() -> Result<PathBuf> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| Error::config("Unable to determine home directory".to_string()))?;
    Ok(home_dir.join(".symnotify").join("config.toml"))
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Watcher configuration
    #[serde(default)]
    pub watcher: WatcherConfig,

    /// Bytes-written exporter configuration
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Load generator configuration
    #[serde(default)]
    pub stress: StressConfig,
}

/// Watcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Capacity of the raw event channel; events beyond it are dropped
    /// and reported as an overflow error
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,
}

/// Bytes-written exporter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// HTTP scrape address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Name of the per-file counter
    #[serde(default = "default_metric_name")]
    pub metric_name: String,

    /// Help text of the per-file counter
    #[serde(default = "default_metric_help")]
    pub metric_help: String,
}

impl MetricsConfig {
    /// Parse the configured listen address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.listen_addr.parse().map_err(|e| {
            Error::config(format!("Invalid listen address '{}': {e}", self.listen_addr))
        })
    }
}

/// Load generator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressConfig {
    /// Directory holding the links; targets go to `<dir>/files`
    #[serde(default = "default_stress_dir")]
    pub dir: String,

    /// How long to run, in seconds
    #[serde(default = "default_stress_duration_secs")]
    pub duration_secs: u64,

    /// Number of linked files
    #[serde(default = "default_stress_files")]
    pub files: usize,

    /// Chance (0-100) that an iteration rotates instead of writing
    #[serde(default = "default_rotate_percent")]
    pub rotate_percent: u8,
}

impl StressConfig {
    /// Get the run duration
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: default_event_buffer_size(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            metric_name: default_metric_name(),
            metric_help: default_metric_help(),
        }
    }
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            dir: default_stress_dir(),
            duration_secs: default_stress_duration_secs(),
            files: default_stress_files(),
            rotate_percent: default_rotate_percent(),
        }
    }
}

impl Config {
    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.watcher.event_buffer_size == 0 {
            return Err(Error::config(
                "Invalid event_buffer_size: must be greater than 0",
            ));
        }

        self.metrics.socket_addr()?;

        if self.metrics.metric_name.trim().is_empty() {
            return Err(Error::config("Invalid metric_name: must not be empty"));
        }

        if self.stress.files == 0 {
            return Err(Error::config("Invalid stress files: must be greater than 0"));
        }

        if self.stress.rotate_percent > 100 {
            return Err(Error::config(format!(
                "Invalid rotate_percent {}: must be between 0 and 100",
                self.stress.rotate_percent
            )));
        }

        Ok(())
    }

    /// Saves configuration to a TOML file
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
