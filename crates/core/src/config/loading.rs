//! Configuration loading from files and environment variables

use crate::error::{Error, Result};
use config::{Config as ConfigLib, ConfigBuilder as LibConfigBuilder, Environment, File};
use std::path::Path;

use super::defaults::*;
use super::{global_config_path, Config};

/// Helper to set a config default with consistent error mapping
fn set_config_default<T: Into<config::Value>>(
    builder: LibConfigBuilder<config::builder::DefaultState>,
    key: &str,
    value: T,
) -> Result<LibConfigBuilder<config::builder::DefaultState>> {
    builder
        .set_default(key, value)
        .map_err(|e| Error::config(format!("Failed to set {key} default: {e}")))
}

impl Config {
    /// Loads configuration from a TOML file with environment variable overrides
    ///
    /// Environment variables are prefixed with `SYMNOTIFY_` and use double underscores
    /// for nested values. For example:
    /// - `SYMNOTIFY_METRICS__LISTEN_ADDR=127.0.0.1:9000`
    pub fn from_file(path: &Path) -> Result<Self> {
        let builder = ConfigLib::builder();

        // config crate doesn't apply serde defaults for missing sections
        let builder = set_config_default(
            builder,
            "watcher.event_buffer_size",
            default_event_buffer_size() as i64,
        )?;
        let builder = set_config_default(builder, "metrics.listen_addr", default_listen_addr())?;
        let builder = set_config_default(builder, "metrics.metric_name", default_metric_name())?;
        let builder = set_config_default(builder, "metrics.metric_help", default_metric_help())?;
        let builder = set_config_default(builder, "stress.dir", default_stress_dir())?;
        let builder = set_config_default(
            builder,
            "stress.duration_secs",
            default_stress_duration_secs() as i64,
        )?;
        let builder = set_config_default(builder, "stress.files", default_stress_files() as i64)?;
        let mut builder = set_config_default(
            builder,
            "stress.rotate_percent",
            default_rotate_percent() as i64,
        )?;

        // Add the config file if it exists
        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("SYMNOTIFY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| Error::config(format!("Failed to deserialize config: {e}")))
    }

    /// Creates a config from a TOML string (useful for testing)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from a single file
    ///
    /// Precedence (lowest to highest):
    /// 1. Hardcoded defaults
    /// 2. Config file (~/.symnotify/config.toml or custom --config path)
    /// 3. Environment variables (SYMNOTIFY_*)
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = match config_path {
            Some(p) => p.to_path_buf(),
            None => global_config_path()?,
        };
        Self::from_file(&path)
    }
}
