//! Session hosting for the alignment game.
//!
//! Each session runs as a single actor task that owns its state, fed by a
//! bounded inbound queue and draining into an outbound worker that persists
//! every committed event before delivering it. The registry supervises the
//! actors and rebuilds a faulted one from its snapshot and event log.
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the orchestrator, builder, and configuration
//! - [`api`] exposes the session handle and error types
//! - [`registry`] creates, supervises, and restarts sessions
//! - [`scheduler`] fires phase timers into session queues
//! - [`events`] provides the topic-based bus used as the default broadcaster
//! - [`repository`] defines sink contracts with file and in-memory adapters
//! - [`logging`] sets up tracing subscribers
//! - `workers` keeps the actor and outbound tasks internal to the crate
pub mod api;
pub mod events;
pub mod logging;
pub mod registry;
pub mod repository;
pub mod runtime;
pub mod scheduler;

mod workers;

pub use api::{Result, RuntimeError, SessionHandle, SessionHealth, SessionStatus};
pub use events::{EventBus, Topic};
pub use logging::{LOG_ENV, LOG_FILE, LogFormat, env_filter, init_logging};
pub use registry::{RegistryStats, SessionRegistry};
pub use repository::{
    Broadcaster, EventSink, FileEventLog, FileSnapshotStore, InMemoryEventSink,
    InMemorySnapshotStore, SinkError, Sinks, SnapshotStore, default_data_dir,
};
pub use runtime::{Runtime, RuntimeBuilder, RuntimeConfig};
pub use scheduler::{PhaseScheduler, TimerKey};
