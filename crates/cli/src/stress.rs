//! `symnotify stress`: synthetic write/rotate load on symlinked files
//!
//! Creates `files` symlinks under `dir`, each pointing to a file under
//! `dir/files`, then keeps appending to and rotating the targets until the
//! configured time is up. The whole directory is removed afterwards.

use anyhow::{Context, Result};
use rand::Rng;
use std::path::{Path, PathBuf};
use std::time::Duration;
use symnotify_core::config::StressConfig;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{info, warn};

/// What one file's task did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChurnStats {
    pub writes: u64,
    pub rotates: u64,
}

/// Name of the `index`-th test file
pub fn file_name(index: usize) -> String {
    format!("test{index:09}.log")
}

/// Run the load generator described by `config`
pub async fn run(config: &StressConfig) -> Result<()> {
    let links = PathBuf::from(&config.dir);
    let result = generate(config, &links).await;

    if let Err(e) = tokio::fs::remove_dir_all(&links).await {
        warn!("Failed to remove {}: {e}", links.display());
    }
    result
}

async fn generate(config: &StressConfig, links: &Path) -> Result<()> {
    let files = links.join("files");
    tokio::fs::create_dir_all(&files)
        .await
        .with_context(|| format!("Failed to create {}", files.display()))?;

    let deadline = Instant::now() + config.duration();
    let mut tasks = JoinSet::new();
    for index in 0..config.files {
        let name = file_name(index);
        let target = files.join(&name);
        File::create(&target)
            .await
            .with_context(|| format!("Failed to create {}", target.display()))?;
        tokio::fs::symlink(&target, links.join(&name))
            .await
            .with_context(|| format!("Failed to link {name}"))?;

        let rotate_percent = config.rotate_percent;
        tasks.spawn(async move {
            let stats = churn(&target, deadline, rotate_percent).await?;
            info!("{}: writes: {} rotates: {}", name, stats.writes, stats.rotates);
            Ok::<_, anyhow::Error>(stats)
        });
    }
    info!(
        "Churning {} files under {} for {:?}",
        config.files,
        links.display(),
        config.duration()
    );

    let mut total = ChurnStats::default();
    while let Some(joined) = tasks.join_next().await {
        let stats = joined.context("Stress task panicked")??;
        total.writes += stats.writes;
        total.rotates += stats.rotates;
    }
    info!("total: writes: {} rotates: {}", total.writes, total.rotates);
    Ok(())
}

/// Append to or rotate `target` at random until `deadline`
pub async fn churn(target: &Path, deadline: Instant, rotate_percent: u8) -> Result<ChurnStats> {
    let mut stats = ChurnStats::default();
    let rotated = rotation_path(target);

    while Instant::now() < deadline {
        let draw: u64 = rand::thread_rng().gen_range(0..100);
        if draw < u64::from(rotate_percent) {
            File::create(&rotated).await?;
            tokio::fs::rename(&rotated, target).await?;
            stats.rotates += 1;
        } else {
            let mut file = OpenOptions::new()
                .append(true)
                .create(true)
                .open(target)
                .await?;
            file.write_all(b"X").await?;
            file.flush().await?;
            stats.writes += 1;
        }
        tokio::time::sleep(Duration::from_millis(draw / 10)).await;
    }
    Ok(stats)
}

fn rotation_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push("_rotate");
    target.with_file_name(name)
}
