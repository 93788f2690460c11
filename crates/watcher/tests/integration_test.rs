//! Integration tests for the symlink-aware watcher
//!
//! These tests use temporary directories and real filesystem operations
//! against the platform event source.

#![cfg(target_os = "linux")]

use pretty_assertions::assert_eq;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::unix::fs::{symlink, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use symnotify_watcher::{Event, Op, SymlinkWatcher};
use tempfile::TempDir;
use tokio_test::assert_ok;

/// Helper to create a file and keep it open for writing
fn create(path: &Path) -> File {
    File::create(path).unwrap()
}

fn open_for_write(path: &Path) -> File {
    OpenOptions::new().write(true).open(path).unwrap()
}

async fn next(watcher: &SymlinkWatcher) -> Event {
    watcher.event_timeout(Duration::from_secs(2)).await.unwrap()
}

async fn assert_idle(watcher: &SymlinkWatcher) {
    let err = watcher
        .event_timeout(Duration::from_millis(200))
        .await
        .expect_err("expected no pending events");
    assert!(err.is_deadline_exceeded(), "unexpected error: {err}");
}

/// Watched directory `dir` with file `file1` and link `link1 -> dir2/target1`
struct Fixture {
    dir: TempDir,
    dir2: TempDir,
    watcher: SymlinkWatcher,
}

impl Fixture {
    async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let dir2 = TempDir::new().unwrap();
        create(&dir.path().join("file1"));
        create(&dir2.path().join("target1"));
        symlink(dir2.path().join("target1"), dir.path().join("link1")).unwrap();

        let watcher = SymlinkWatcher::new().unwrap();
        assert_ok!(watcher.add(dir.path()).await);
        Self { dir, dir2, watcher }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn target(&self, name: &str) -> PathBuf {
        self.dir2.path().join(name)
    }
}

#[tokio::test]
async fn test_no_events_right_after_add() {
    let fx = Fixture::new().await;
    let err = fx
        .watcher
        .event_timeout(Duration::ZERO)
        .await
        .expect_err("nothing should be pending");
    assert!(err.is_deadline_exceeded());
}

#[tokio::test]
async fn test_existing_symlink_target_write_reported_under_link() {
    let fx = Fixture::new().await;
    assert!(fx.watcher.is_registered(fx.path("link1")).await);

    let mut target1 = open_for_write(&fx.target("target1"));
    target1.write_all(b"hello").unwrap();
    assert_eq!(next(&fx.watcher).await, Event::new(fx.path("link1"), Op::Write));

    let mut file1 = open_for_write(&fx.path("file1"));
    file1.write_all(b"hello").unwrap();
    assert_eq!(next(&fx.watcher).await, Event::new(fx.path("file1"), Op::Write));
    file1.set_len(0).unwrap();
    assert_eq!(next(&fx.watcher).await, Event::new(fx.path("file1"), Op::Write));
}

#[tokio::test]
async fn test_new_files_and_links() {
    let fx = Fixture::new().await;

    let mut file2 = create(&fx.path("file2"));
    assert_eq!(next(&fx.watcher).await, Event::new(fx.path("file2"), Op::Create));

    let mut target2 = create(&fx.target("target2"));
    symlink(fx.target("target2"), fx.path("link2")).unwrap();
    assert_eq!(next(&fx.watcher).await, Event::new(fx.path("link2"), Op::Create));
    assert!(fx.watcher.is_registered(fx.path("link2")).await);
    assert!(!fx.watcher.is_explicit(fx.path("link2")).await);

    file2.write_all(b"hello").unwrap();
    assert_eq!(next(&fx.watcher).await, Event::new(fx.path("file2"), Op::Write));

    target2.write_all(b"hello").unwrap();
    assert_eq!(next(&fx.watcher).await, Event::new(fx.path("link2"), Op::Write));

    target2
        .set_permissions(std::fs::Permissions::from_mode(0o444))
        .unwrap();
    assert_eq!(next(&fx.watcher).await, Event::new(fx.path("link2"), Op::Chmod));

    // Deleting the target while the link survives shows up as a Chmod on the link
    std::fs::remove_file(fx.target("target2")).unwrap();
    assert_eq!(next(&fx.watcher).await, Event::new(fx.path("link2"), Op::Chmod));

    assert_idle(&fx.watcher).await;
    drop(target2);
}

#[tokio::test]
async fn test_rename_reports_old_and_new_names() {
    let fx = Fixture::new().await;

    std::fs::rename(fx.path("file1"), fx.path("newfile1")).unwrap();
    assert_eq!(next(&fx.watcher).await, Event::new(fx.path("file1"), Op::Rename));
    assert_eq!(next(&fx.watcher).await, Event::new(fx.path("newfile1"), Op::Create));
}

#[tokio::test]
async fn test_removing_discovered_link_drops_its_registration() {
    let fx = Fixture::new().await;

    std::fs::remove_file(fx.path("link1")).unwrap();
    assert_eq!(next(&fx.watcher).await, Event::new(fx.path("link1"), Op::Remove));
    assert!(!fx.watcher.is_registered(fx.path("link1")).await);

    // The old target is no longer reported under the removed link
    let mut target1 = open_for_write(&fx.target("target1"));
    target1.write_all(b"hello").unwrap();
    assert_idle(&fx.watcher).await;
}

#[tokio::test]
async fn test_link_rotation_keeps_name() {
    let fx = Fixture::new().await;

    // Rotate: point a fresh link at a new target under the same name
    std::fs::remove_file(fx.path("link1")).unwrap();
    assert_eq!(next(&fx.watcher).await, Event::new(fx.path("link1"), Op::Remove));

    let mut rotated = create(&fx.target("target1.1"));
    symlink(fx.target("target1.1"), fx.path("link1")).unwrap();
    assert_eq!(next(&fx.watcher).await, Event::new(fx.path("link1"), Op::Create));

    rotated.write_all(b"after rotation").unwrap();
    assert_eq!(next(&fx.watcher).await, Event::new(fx.path("link1"), Op::Write));
}

#[tokio::test]
async fn test_add_missing_path_fails() {
    let watcher = SymlinkWatcher::new().unwrap();
    let err = watcher
        .add("/definitely/not/a/real/path")
        .await
        .expect_err("missing path must be rejected");
    assert!(err.is_not_found());
    assert!(watcher.registered_paths().await.is_empty());
}

#[tokio::test]
async fn test_explicit_file_watch_survives_remove_event() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("watched.log");
    create(&file);

    let watcher = SymlinkWatcher::new().unwrap();
    assert_ok!(watcher.add(&file).await);

    std::fs::remove_file(&file).unwrap();
    let event = next(&watcher).await;
    assert_eq!(event.name, file);
    assert!(watcher.is_explicit(&file).await);
}

#[tokio::test]
async fn test_close_unblocks_pending_read() {
    let fx = Fixture::new().await;
    let watcher = Arc::new(fx.watcher);

    let reader = {
        let watcher = Arc::clone(&watcher);
        tokio::spawn(async move { watcher.event_timeout(Duration::from_secs(3600)).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_ok!(watcher.close().await);
    let result = tokio::time::timeout(Duration::from_secs(5), reader)
        .await
        .expect("blocked read should return promptly")
        .unwrap();
    assert!(result.unwrap_err().is_end_of_stream());

    // The stream does not reopen
    assert!(watcher.event().await.unwrap_err().is_end_of_stream());
}
