//! Persistence and delivery sinks for committed session events.
//!
//! - [`EventSink`]: append-only event log, queried by sequence number
//! - [`SnapshotStore`]: latest state snapshot per session
//! - [`Broadcaster`]: delivery to session members or a single player
//!
//! In-memory implementations back tests and local runs; the file-backed
//! ones write JSON so logs stay readable and replayable across builds.

mod error;
mod file;
mod memory;
mod traits;

pub use error::{Result, SinkError};
pub use file::{FileEventLog, FileSnapshotStore, default_data_dir};
pub use memory::{InMemoryEventSink, InMemorySnapshotStore};
pub use traits::{Broadcaster, EventSink, Sinks, SnapshotStore};
