//! Library interface for the symnotify CLI
//!
//! This module exposes the subcommand implementations for testing while
//! keeping argument parsing and logging setup in main.rs.

pub mod exporter;
pub mod stress;
pub mod watch;

// Re-export commonly needed types for tests
pub use anyhow::Result;
pub use symnotify_core::config::Config;
