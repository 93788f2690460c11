//! Event types delivered to watcher consumers

use std::fmt;
use std::path::{Path, PathBuf};

/// Kind of change an event reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// A new entry appeared in a watched directory
    Create,
    /// Contents changed (includes truncation)
    Write,
    /// An entry was removed
    Remove,
    /// An entry was renamed away from this name
    Rename,
    /// Attributes changed
    Chmod,
}

impl Op {
    /// Upper-case name used when printing events
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Write => "WRITE",
            Self::Remove => "REMOVE",
            Self::Rename => "RENAME",
            Self::Chmod => "CHMOD",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single change notification
///
/// For changes to the target of a watched symlink, `name` is the path of the
/// link, not of the target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Event {
    /// Path the change is reported under
    pub name: PathBuf,
    /// Kind of change
    pub op: Op,
}

impl Event {
    /// Create a new event
    pub fn new(name: impl Into<PathBuf>, op: Op) -> Self {
        Self {
            name: name.into(),
            op,
        }
    }

    /// Path the change is reported under
    pub fn path(&self) -> &Path {
        &self.name
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.name.display().to_string(), self.op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_display() {
        let event = Event::new("/var/log/current.log", Op::Write);
        assert_eq!(event.to_string(), "\"/var/log/current.log\": WRITE");
    }

    #[test]
    fn test_op_names() {
        assert_eq!(Op::Create.to_string(), "CREATE");
        assert_eq!(Op::Chmod.as_str(), "CHMOD");
    }
}
