//! Raw event sources
//!
//! A raw source watches individually registered paths and reports changes
//! on two streams, one for events and one for operational errors. It does
//! not follow symlinks inside a watched directory; registering the link's
//! own path makes it observe whatever the link resolves to at registration.

use crate::events::{Event, Op};
use notify::event::{ModifyKind, RenameMode};
use notify::{
    Config as NotifyConfig, Event as NotifyEvent, EventKind, RecommendedWatcher, RecursiveMode,
    Watcher as NotifyWatcher,
};
use std::path::Path;
use symnotify_core::error::{Error, Result};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::trace;

/// Primitive that watches registered paths
pub trait RawEventSource: Send {
    /// Start watching `path`
    fn register(&mut self, path: &Path) -> Result<()>;
    /// Stop watching `path`
    fn unregister(&mut self, path: &Path) -> Result<()>;
    /// Release the source; both streams end once it is gone
    fn close(&mut self) -> Result<()>;
}

/// Receiving halves of a raw source's streams
#[derive(Debug)]
pub struct RawStreams {
    pub events: mpsc::Receiver<Event>,
    pub errors: mpsc::UnboundedReceiver<Error>,
}

/// Sending halves of a raw source's streams
#[derive(Debug, Clone)]
pub struct RawSender {
    events: mpsc::Sender<Event>,
    errors: mpsc::UnboundedSender<Error>,
}

/// Create a connected sender/streams pair holding at most `capacity` events
pub fn raw_channel(capacity: usize) -> (RawSender, RawStreams) {
    let (event_tx, event_rx) = mpsc::channel(capacity.max(1));
    let (error_tx, error_rx) = mpsc::unbounded_channel();
    (
        RawSender {
            events: event_tx,
            errors: error_tx,
        },
        RawStreams {
            events: event_rx,
            errors: error_rx,
        },
    )
}

impl RawSender {
    /// Queue an event; a full queue drops it and reports an overflow error
    pub fn deliver(&self, event: Event) {
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                self.fail(Error::raw_source(format!(
                    "event queue overflow, dropped {} for {:?}",
                    dropped.op, dropped.name
                )));
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }

    /// Queue an operational error
    pub fn fail(&self, error: Error) {
        let _ = self.errors.send(error);
    }
}

/// Raw source backed by the platform's native notify watcher
pub struct NotifySource {
    watcher: Option<RecommendedWatcher>,
}

impl NotifySource {
    /// Open the platform watcher, buffering up to `event_buffer_size` events
    pub fn new(event_buffer_size: usize) -> Result<(Self, RawStreams)> {
        let (sender, streams) = raw_channel(event_buffer_size);

        let watcher = RecommendedWatcher::new(
            move |res: std::result::Result<NotifyEvent, notify::Error>| match res {
                Ok(event) => {
                    trace!("Received notify event: {:?}", event);
                    for event in translate(event) {
                        sender.deliver(event);
                    }
                }
                Err(e) => sender.fail(Error::raw_source(e.to_string())),
            },
            NotifyConfig::default(),
        )
        .map_err(|e| Error::init(format!("Failed to create watcher: {e}")))?;

        Ok((
            Self {
                watcher: Some(watcher),
            },
            streams,
        ))
    }

    fn watcher(&mut self) -> Result<&mut RecommendedWatcher> {
        self.watcher.as_mut().ok_or(Error::Closed)
    }
}

impl RawEventSource for NotifySource {
    fn register(&mut self, path: &Path) -> Result<()> {
        self.watcher()?
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| registration_error(path, e))
    }

    fn unregister(&mut self, path: &Path) -> Result<()> {
        self.watcher()?
            .unwatch(path)
            .map_err(|e| registration_error(path, e))
    }

    fn close(&mut self) -> Result<()> {
        // Dropping the watcher drops the stream senders with it
        self.watcher.take().map(drop).ok_or(Error::Closed)
    }
}

fn registration_error(path: &Path, error: notify::Error) -> Error {
    let not_found = match &error.kind {
        notify::ErrorKind::PathNotFound => true,
        notify::ErrorKind::Io(io) => io.kind() == std::io::ErrorKind::NotFound,
        _ => false,
    };
    if not_found {
        Error::registration_not_found(path, error.to_string())
    } else {
        Error::registration(path, error.to_string())
    }
}

/// Map a notify event kind to an op, or `None` for kinds that are not reported
fn op_for(kind: &EventKind) -> Option<Op> {
    match kind {
        EventKind::Create(_) => Some(Op::Create),
        EventKind::Remove(_) => Some(Op::Remove),
        EventKind::Modify(ModifyKind::Metadata(_)) => Some(Op::Chmod),
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            // The new name shows up as an entry appearing in its directory
            RenameMode::To => Some(Op::Create),
            // Already reported by the From/To pair
            RenameMode::Both => None,
            RenameMode::From | RenameMode::Any | RenameMode::Other => Some(Op::Rename),
        },
        EventKind::Modify(ModifyKind::Data(_))
        | EventKind::Modify(ModifyKind::Any)
        | EventKind::Modify(ModifyKind::Other) => Some(Op::Write),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
    }
}

/// Split a notify event into one event per path
fn translate(event: NotifyEvent) -> Vec<Event> {
    match op_for(&event.kind) {
        Some(op) => event
            .paths
            .into_iter()
            .map(|name| Event::new(name, op))
            .collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, AccessMode, CreateKind, DataChange, MetadataKind, RemoveKind};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn notify_event(kind: EventKind, paths: &[&str]) -> NotifyEvent {
        let mut event = NotifyEvent::new(kind);
        for path in paths {
            event = event.add_path(PathBuf::from(path));
        }
        event
    }

    #[test]
    fn test_op_mapping() {
        assert_eq!(op_for(&EventKind::Create(CreateKind::File)), Some(Op::Create));
        assert_eq!(op_for(&EventKind::Remove(RemoveKind::Any)), Some(Op::Remove));
        assert_eq!(
            op_for(&EventKind::Modify(ModifyKind::Data(DataChange::Content))),
            Some(Op::Write)
        );
        assert_eq!(
            op_for(&EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any))),
            Some(Op::Chmod)
        );
        assert_eq!(
            op_for(&EventKind::Access(AccessKind::Close(AccessMode::Write))),
            None
        );
    }

    #[test]
    fn test_rename_pair_reports_old_and_new_name() {
        let from = notify_event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            &["/d/file1"],
        );
        let to = notify_event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            &["/d/newfile1"],
        );
        let both = notify_event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/d/file1", "/d/newfile1"],
        );

        assert_eq!(translate(from), vec![Event::new("/d/file1", Op::Rename)]);
        assert_eq!(translate(to), vec![Event::new("/d/newfile1", Op::Create)]);
        assert!(translate(both).is_empty());
    }

    #[test]
    fn test_translate_splits_paths() {
        let event = notify_event(EventKind::Remove(RemoveKind::File), &["/d/a", "/d/b"]);
        assert_eq!(
            translate(event),
            vec![Event::new("/d/a", Op::Remove), Event::new("/d/b", Op::Remove)]
        );
    }

    #[tokio::test]
    async fn test_overflow_reported_on_error_stream() {
        let (sender, mut streams) = raw_channel(1);
        sender.deliver(Event::new("/d/a", Op::Write));
        sender.deliver(Event::new("/d/b", Op::Write));

        let first = streams.events.recv().await.expect("first event queued");
        assert_eq!(first, Event::new("/d/a", Op::Write));
        assert!(streams.events.try_recv().is_err());

        let error = streams.errors.recv().await.expect("overflow reported");
        assert!(matches!(error, Error::RawSource(_)));
        assert!(error.to_string().contains("overflow"));
    }

    #[test]
    fn test_register_missing_path_is_not_found() {
        let (mut source, _streams) = NotifySource::new(8).expect("test setup failed");
        let err = source
            .register(Path::new("/definitely/not/here"))
            .expect_err("missing path must be rejected");
        assert!(matches!(err, Error::Registration { .. }));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_close_twice_reports_closed() {
        let (mut source, _streams) = NotifySource::new(8).expect("test setup failed");
        assert!(source.close().is_ok());
        assert!(matches!(source.close(), Err(Error::Closed)));
        assert!(matches!(
            source.register(Path::new("/tmp")),
            Err(Error::Closed)
        ));
    }

    #[tokio::test]
    async fn test_close_ends_streams() {
        let (mut source, mut streams) = NotifySource::new(8).expect("test setup failed");
        source.close().expect("close failed");
        let ended = tokio::time::timeout(std::time::Duration::from_secs(5), streams.events.recv())
            .await
            .expect("stream should end after close");
        assert!(ended.is_none());
    }
}
