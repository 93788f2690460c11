#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

//! Symlink-aware file system watching
//!
//! This crate reports changes to files in watched directories, including
//! changes to the targets of symlinks inside them. A write to the target of
//! `current.log -> current.log.2024` is reported under `current.log`, so a
//! consumer keeps following the same name while the target rotates.
//!
//! # Example
//!
//! ```no_run
//! use symnotify_watcher::{Op, SymlinkWatcher};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let watcher = SymlinkWatcher::new()?;
//! watcher.add("/var/log/app").await?;
//!
//! loop {
//!     let event = watcher.event().await?;
//!     if event.op == Op::Write {
//!         println!("written: {}", event.name.display());
//!     }
//! }
//! # }
//! ```

// Private implementation modules
mod events;
mod probe;
mod source;
mod watcher;

// Public exports - minimal API surface
pub use events::{Event, Op};
pub use probe::{EntryMetadata, FsProbe, LocalFs};
pub use source::{raw_channel, NotifySource, RawEventSource, RawSender, RawStreams};
pub use symnotify_core::error::{Error, Result};
pub use watcher::SymlinkWatcher;
