//! symnotify CLI - symlink-aware file watching tools
//!
//! This binary provides the command-line interface for the symnotify watcher.

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use symnotify::{exporter, stress, watch};

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use symnotify_core::config::Config;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "symnotify")]
#[command(about = "Watch files and the targets of symlinks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print events for files, directories and symlinks
    Watch {
        /// Paths to watch
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Serve bytes written per file as Prometheus metrics
    Metrics {
        /// Address to serve /metrics on
        #[arg(long, value_name = "ADDR")]
        addr: Option<String>,

        /// Paths to watch
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Generate write and rotate load on symlinked files
    Stress {
        /// Directory for links; targets go to DIR/files
        #[arg(long, value_name = "DIR")]
        dir: Option<String>,

        /// How long to run
        #[arg(long, value_name = "SECS")]
        time: Option<u64>,

        /// Number of files
        #[arg(long, value_name = "N")]
        files: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    let mut config = Config::load(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli.command);
    config.validate()?;
    debug!("Configuration: {:?}", config);

    match &cli.command {
        Commands::Watch { paths } => watch::run(&config, paths).await,
        Commands::Metrics { paths, .. } => exporter::run(&config, paths).await,
        Commands::Stress { .. } => stress::run(&config.stress).await,
    }
}

/// Initialize logging system
///
/// Logs go to stderr so `watch` output on stdout stays clean. `RUST_LOG`
/// takes precedence over `--verbose`.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{}={level},symnotify_core={level},symnotify_watcher={level}",
            env!("CARGO_PKG_NAME")
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Command-line flags win over the config file and environment
fn apply_overrides(config: &mut Config, command: &Commands) {
    match command {
        Commands::Watch { .. } => {}
        Commands::Metrics { addr, .. } => {
            if let Some(addr) = addr {
                config.metrics.listen_addr = addr.clone();
            }
        }
        Commands::Stress { dir, time, files } => {
            if let Some(dir) = dir {
                config.stress.dir = dir.clone();
            }
            if let Some(time) = time {
                config.stress.duration_secs = *time;
            }
            if let Some(files) = files {
                config.stress.files = *files;
            }
        }
    }
}
