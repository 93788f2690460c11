//! `symnotify metrics`: export bytes written per file for Prometheus
//!
//! Every file that receives a Write event becomes a series of the configured
//! counter, labelled with its path. Sizes are read at scrape time: growth
//! since the previous scrape is added to the counter, and a file that shrank
//! (truncated or rotated) counts its whole new size.

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use symnotify_core::config::{Config, MetricsConfig};
use symnotify_watcher::{FsProbe, Op, RawEventSource, SymlinkWatcher};
use tracing::{debug, error, info};

const LABEL: &str = "filename";

/// Per-file size counters
pub struct FileSizeCounters {
    metric_name: String,
    metric_help: String,
    /// Size of each tracked file at the last scrape
    files: DashMap<PathBuf, u64>,
}

impl FileSizeCounters {
    pub fn new(config: &MetricsConfig) -> Self {
        Self {
            metric_name: config.metric_name.clone(),
            metric_help: config.metric_help.clone(),
            files: DashMap::new(),
        }
    }

    /// Register the counter's help text with the installed recorder
    pub fn describe(&self) {
        metrics::describe_counter!(self.metric_name.clone(), self.metric_help.clone());
    }

    /// Start reporting `path`; returns false if it was already tracked
    pub fn track(&self, path: &Path) -> bool {
        match self.files.entry(path.to_path_buf()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(0);
                true
            }
        }
    }

    /// Tracked files, sorted
    pub fn tracked(&self) -> Vec<PathBuf> {
        let mut files: Vec<_> = self.files.iter().map(|e| e.key().clone()).collect();
        files.sort();
        files
    }

    /// Add the bytes written to each file since the last refresh
    ///
    /// Sizes are read without holding any map lock, so `track` is never
    /// blocked behind a slow stat.
    pub fn refresh(&self) {
        for path in self.tracked() {
            let size = file_size(&path);
            let Some(previous) = self.files.insert(path.clone(), size) else {
                continue;
            };
            let written = bytes_written_since(previous, size);

            let filename = path.display().to_string();
            metrics::counter!(self.metric_name.clone(), LABEL => filename).increment(written);
        }
    }

    #[cfg(test)]
    fn last_size(&self, path: &Path) -> Option<u64> {
        self.files.get(path).map(|size| *size)
    }
}

/// Bytes written between two size readings; a shrink means the file was reset
fn bytes_written_since(previous: u64, current: u64) -> u64 {
    if current >= previous {
        current - previous
    } else {
        current
    }
}

/// Size of a regular file, or 0 if it is missing or a directory
pub fn file_size(path: &Path) -> u64 {
    match std::fs::metadata(path) {
        Ok(metadata) if !metadata.is_dir() => metadata.len(),
        _ => 0,
    }
}

/// Shared state of the scrape endpoint
#[derive(Clone)]
pub struct ExporterState {
    pub counters: Arc<FileSizeCounters>,
    pub handle: PrometheusHandle,
}

impl ExporterState {
    /// Refresh all series and render them in Prometheus text format
    pub fn render(&self) -> String {
        self.counters.refresh();
        self.handle.render()
    }
}

/// Build the router serving `/metrics`
pub fn build_router(state: ExporterState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

async fn metrics_handler(State(state): State<ExporterState>) -> Response {
    // Stat calls block; keep them off the runtime's worker threads
    match tokio::task::spawn_blocking(move || state.render()).await {
        Ok(body) => ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response(),
        Err(e) => {
            error!("Metrics render task failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Track every file that receives a Write event until the stream ends
pub async fn record_writes<S, P>(
    watcher: Arc<SymlinkWatcher<S, P>>,
    counters: Arc<FileSizeCounters>,
) where
    S: RawEventSource,
    P: FsProbe,
{
    loop {
        match watcher.event().await {
            Ok(event) => {
                debug!("watch event: {}", event);
                // Write (which includes truncate) is the only op that changes size
                if event.op == Op::Write && counters.track(&event.name) {
                    debug!("tracking {:?}", event.name);
                }
            }
            Err(e) if e.is_end_of_stream() => break,
            Err(e) if e.is_not_found() => {}
            Err(e) => debug!("watch error: {}", e),
        }
    }
    debug!("Event recorder stopped");
}

/// Watch `paths` and serve their byte counters until Ctrl+C
pub async fn run(config: &Config, paths: &[PathBuf]) -> Result<()> {
    let watcher = Arc::new(
        SymlinkWatcher::with_config(&config.watcher).context("Failed to start watcher")?,
    );
    for path in paths {
        watcher
            .add(path)
            .await
            .with_context(|| format!("Failed to watch {}", path.display()))?;
    }
    debug!("watching: {:?}", paths);

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install metrics recorder")?;
    let counters = Arc::new(FileSizeCounters::new(&config.metrics));
    counters.describe();

    let recorder = tokio::spawn(record_writes(Arc::clone(&watcher), Arc::clone(&counters)));

    let addr = config.metrics.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    info!("Serving metrics on http://{addr}/metrics");

    let app = build_router(ExporterState { counters, handle });
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Metrics server error");

    if let Err(e) = watcher.close().await {
        error!("Error closing watcher: {e}");
    }
    let _ = recorder.await;
    info!("Metrics exporter shut down");
    served
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown"),
        Err(e) => error!("Error setting up signal handler: {e}"),
    }
}
