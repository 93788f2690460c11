//! Symlink-aware watcher
//!
//! Wraps a raw event source so that changes to the target of a symlink in a
//! watched directory are reported under the link's own path. The raw source
//! watches direct children of a directory but does not follow links; the
//! watcher registers each link's path with the source when it discovers the
//! link, either while scanning a newly added directory or on a Create event.
//!
//! Registrations made on behalf of the caller (`add`) are explicit. Links the
//! watcher registers on its own are implicit and are unregistered again when
//! a Remove event for them arrives.

use crate::{
    events::{Event, Op},
    probe::{FsProbe, LocalFs},
    source::{NotifySource, RawEventSource, RawStreams},
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use symnotify_core::config::WatcherConfig;
use symnotify_core::error::{Error, Result};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Registration state guarded together with the source it describes
struct Membership<S> {
    source: S,
    /// Paths currently registered with the source
    registered: HashSet<PathBuf>,
    /// Subset of `registered` the caller asked for
    explicit: HashSet<PathBuf>,
    closed: bool,
}

impl<S: RawEventSource> Membership<S> {
    /// Register a discovered link, discarding any failure
    fn register_implicit(&mut self, path: &Path) {
        match self.source.register(path) {
            Ok(()) => {
                debug!("Watching symlink: {:?}", path);
                self.registered.insert(path.to_path_buf());
            }
            Err(e) => trace!("Could not watch symlink {:?}: {}", path, e),
        }
    }

    /// Drop an implicit registration whose entry is gone, discarding any failure
    fn unregister_implicit(&mut self, path: &Path) {
        if self.explicit.contains(path) || !self.registered.remove(path) {
            return;
        }
        match self.source.unregister(path) {
            Ok(()) => debug!("Stopped watching removed symlink: {:?}", path),
            Err(e) => trace!("Could not unwatch {:?}: {}", path, e),
        }
    }
}

/// Outcome of waiting on the raw streams
enum Received {
    Event(Event),
    Error(Error),
    Ended,
}

/// Next item from either stream; `Ended` only once both are closed and drained
async fn receive(streams: &mut RawStreams) -> Received {
    tokio::select! {
        Some(event) = streams.events.recv() => Received::Event(event),
        Some(error) = streams.errors.recv() => Received::Error(error),
        else => Received::Ended,
    }
}

/// Watcher that also reports changes to symlink targets
///
/// All methods take `&self`; share it behind an `Arc` to call `close` from
/// one task while another is blocked reading events. Only one read is served
/// at a time.
pub struct SymlinkWatcher<S = NotifySource, P = LocalFs> {
    membership: Mutex<Membership<S>>,
    streams: Mutex<RawStreams>,
    probe: P,
    shutdown: CancellationToken,
}

impl SymlinkWatcher {
    /// Open a watcher on the platform event source with default settings
    pub fn new() -> Result<Self> {
        Self::with_config(&WatcherConfig::default())
    }

    /// Open a watcher on the platform event source
    pub fn with_config(config: &WatcherConfig) -> Result<Self> {
        let (source, streams) = NotifySource::new(config.event_buffer_size)?;
        Ok(Self::from_parts(source, streams, LocalFs))
    }
}

impl<S, P> SymlinkWatcher<S, P>
where
    S: RawEventSource,
    P: FsProbe,
{
    /// Build a watcher over an already opened source
    pub fn from_parts(source: S, streams: RawStreams, probe: P) -> Self {
        Self {
            membership: Mutex::new(Membership {
                source,
                registered: HashSet::new(),
                explicit: HashSet::new(),
                closed: false,
            }),
            streams: Mutex::new(streams),
            probe,
            shutdown: CancellationToken::new(),
        }
    }

    /// Start watching `path`
    ///
    /// If `path` is a directory, symlinks already inside it are watched as
    /// well, since no Create event will ever be reported for them. Failing to
    /// scan the directory does not fail the call.
    pub async fn add(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut membership = self.membership.lock().await;
        if membership.closed {
            return Err(Error::Closed);
        }

        membership.source.register(path)?;
        membership.registered.insert(path.to_path_buf());
        membership.explicit.insert(path.to_path_buf());
        debug!("Watching path: {:?}", path);

        match self.probe.list(path).await {
            Ok(entries) => {
                for entry in entries.iter().filter(|entry| entry.is_symlink) {
                    membership.register_implicit(&entry.path);
                }
            }
            Err(e) => trace!("Skipping symlink scan of {:?}: {}", path, e),
        }
        Ok(())
    }

    /// Stop watching `path`, whether it was added explicitly or discovered
    ///
    /// The explicit mark is cleared even when the source rejects the removal.
    pub async fn remove(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut membership = self.membership.lock().await;
        if membership.closed {
            return Err(Error::Closed);
        }

        membership.explicit.remove(path);
        membership.source.unregister(path)?;
        membership.registered.remove(path);
        debug!("Stopped watching path: {:?}", path);
        Ok(())
    }

    /// Release the event source
    ///
    /// A read blocked in `event` or `event_timeout` returns `EndOfStream`.
    /// Closing twice returns `Closed`.
    pub async fn close(&self) -> Result<()> {
        let mut membership = self.membership.lock().await;
        if membership.closed {
            return Err(Error::Closed);
        }
        membership.closed = true;
        self.shutdown.cancel();
        membership.registered.clear();
        membership.explicit.clear();
        membership.source.close()
    }

    /// Wait for the next event
    pub async fn event(&self) -> Result<Event> {
        self.next_event(None).await
    }

    /// Wait at most `timeout` for the next event
    ///
    /// Returns `DeadlineExceeded` if nothing arrived in time, `EndOfStream`
    /// once the source is closed, or the source's own error if it reported one.
    pub async fn event_timeout(&self, timeout: Duration) -> Result<Event> {
        self.next_event(Some(timeout)).await
    }

    async fn next_event(&self, timeout: Option<Duration>) -> Result<Event> {
        if self.shutdown.is_cancelled() {
            return Err(Error::EndOfStream);
        }

        let mut streams = tokio::select! {
            streams = self.streams.lock() => streams,
            _ = self.shutdown.cancelled() => return Err(Error::EndOfStream),
        };

        let deadline = async {
            match timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending::<()>().await,
            }
        };

        // First ready branch wins; there is no priority between them
        let received = tokio::select! {
            received = receive(&mut streams) => received,
            _ = deadline => return Err(Error::DeadlineExceeded),
            _ = self.shutdown.cancelled() => return Err(Error::EndOfStream),
        };
        drop(streams);

        match received {
            Received::Ended => Err(Error::EndOfStream),
            Received::Error(e) => Err(e),
            Received::Event(event) => {
                self.translate(&event).await;
                Ok(event)
            }
        }
    }

    /// Keep registrations in step with links appearing and disappearing
    async fn translate(&self, event: &Event) {
        match event.op {
            Op::Create => match self.probe.is_symlink(&event.name).await {
                Ok(true) => {
                    let mut membership = self.membership.lock().await;
                    if !membership.closed {
                        membership.register_implicit(&event.name);
                    }
                }
                Ok(false) => {}
                Err(e) => trace!("Could not inspect {:?}: {}", event.name, e),
            },
            Op::Remove => {
                let mut membership = self.membership.lock().await;
                if !membership.closed {
                    membership.unregister_implicit(&event.name);
                }
            }
            Op::Write | Op::Rename | Op::Chmod => {}
        }
    }

    /// Whether the caller added `path` and has not removed it
    pub async fn is_explicit(&self, path: impl AsRef<Path>) -> bool {
        self.membership
            .lock()
            .await
            .explicit
            .contains(path.as_ref())
    }

    /// Whether `path` is currently registered with the source
    pub async fn is_registered(&self, path: impl AsRef<Path>) -> bool {
        self.membership
            .lock()
            .await
            .registered
            .contains(path.as_ref())
    }

    /// All paths currently registered with the source, sorted
    pub async fn registered_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self
            .membership
            .lock()
            .await
            .registered
            .iter()
            .cloned()
            .collect();
        paths.sort();
        paths
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
