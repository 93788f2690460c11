//! `symnotify watch`: print events for a set of paths

use anyhow::{Context, Result};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use symnotify_core::config::Config;
use symnotify_watcher::{FsProbe, RawEventSource, SymlinkWatcher};
use tracing::{info, warn};

/// Watch `paths` and print every event to stdout until the stream ends
pub async fn run(config: &Config, paths: &[PathBuf]) -> Result<()> {
    let watcher = Arc::new(
        SymlinkWatcher::with_config(&config.watcher).context("Failed to start watcher")?,
    );

    for path in paths {
        if let Err(e) = watcher.add(path).await {
            warn!("Not watching {}: {e}", path.display());
        }
    }
    info!("Watching {} path(s)", watcher.registered_paths().await.len());

    let closer = Arc::clone(&watcher);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, closing watcher"),
            Err(e) => warn!("Error setting up signal handler: {e}"),
        }
        let _ = closer.close().await;
    });

    print_events(&watcher, &mut std::io::stdout()).await
}

/// Write one line per event to `out`; returns when the stream ends
pub async fn print_events<S, P, W>(watcher: &SymlinkWatcher<S, P>, out: &mut W) -> Result<()>
where
    S: RawEventSource,
    P: FsProbe,
    W: Write,
{
    loop {
        match watcher.event().await {
            Ok(event) => {
                writeln!(out, "{event}")?;
                out.flush()?;
            }
            Err(e) if e.is_end_of_stream() => return Ok(()),
            Err(e) => return Err(e).context("Failed to read event"),
        }
    }
}
