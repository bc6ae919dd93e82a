//! In-memory sink implementations for tests and local development.

mod event;
mod snapshot;

pub use event::InMemoryEventSink;
pub use snapshot::InMemorySnapshotStore;
