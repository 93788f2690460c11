use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for symnotify operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for symnotify operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O related errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The raw event source could not be started
    #[error("Initialization error: {0}")]
    Init(String),

    /// The raw event source rejected registering or unregistering a path
    #[error("Registration error for {path:?}: {message}")]
    Registration {
        path: PathBuf,
        message: String,
        not_found: bool,
    },

    /// No event arrived before the read timeout elapsed
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The event stream is closed and will not produce further events
    #[error("end of event stream")]
    EndOfStream,

    /// Operational error reported by the raw event source
    #[error("Raw source error: {0}")]
    RawSource(String),

    /// Operation attempted on a closed watcher
    #[error("watcher is closed")]
    Closed,
}

impl Error {
    /// Creates a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an initialization error
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Init(msg.into())
    }

    /// Creates a registration error for `path`
    pub fn registration(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::Registration {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
            not_found: false,
        }
    }

    /// Creates a registration error for a path that does not exist
    pub fn registration_not_found(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::Registration {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
            not_found: true,
        }
    }

    /// Creates a raw source error
    pub fn raw_source(msg: impl Into<String>) -> Self {
        Self::RawSource(msg.into())
    }

    /// True if a read timed out without an event
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Self::DeadlineExceeded)
    }

    /// True if the event stream has ended for good
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream)
    }

    /// True if the error refers to a path that does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Registration { not_found, .. } => *not_found,
            Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
