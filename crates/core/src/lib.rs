//! Core types for symnotify
//!
//! This crate provides the foundational pieces shared by the watcher and the
//! command-line front-end:
//!
//! - **Error handling**: Unified error type covering watcher registration,
//!   event reads and configuration
//! - **Configuration**: Layered configuration (defaults, TOML file, environment)
//!

pub mod config;
pub mod error;

// Re-export main types for convenience
pub use config::{Config, MetricsConfig, StressConfig, WatcherConfig};
pub use error::{Error, Result};
