//! High-level runtime orchestrator.
//!
//! The runtime owns the session registry, the shared phase scheduler, and
//! the health monitor, and exposes a builder-based API for hosts to plug in
//! their own persistence and transport.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use alignment_core::{Catalog, ModifierProvider, SessionId, SessionSettings};

use crate::api::{Result, RuntimeError, SessionHandle};
use crate::events::EventBus;
use crate::registry::{RegistryStats, SessionRegistry};
use crate::repository::{
    Broadcaster, EventSink, InMemoryEventSink, InMemorySnapshotStore, Sinks, SnapshotStore,
};
use crate::scheduler::PhaseScheduler;

/// Runtime configuration shared by the registry and every session.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Bounded inbound queue per session; actions beyond it are dropped.
    pub inbound_queue_capacity: usize,
    pub outbound_queue_capacity: usize,
    /// How long `post_action` and `state` wait for the actor.
    pub reply_timeout: Duration,
    pub scheduler_tick: Duration,
    pub health_check_interval: Duration,
    /// Committed events between snapshots.
    pub snapshot_every: u64,
    pub default_settings: SessionSettings,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            inbound_queue_capacity: 100,
            outbound_queue_capacity: 256,
            reply_timeout: Duration::from_secs(5),
            scheduler_tick: Duration::from_secs(1),
            health_check_interval: Duration::from_secs(30),
            snapshot_every: 50,
            default_settings: SessionSettings::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn with_inbound_queue_capacity(mut self, capacity: usize) -> Self {
        self.inbound_queue_capacity = capacity.max(1);
        self
    }

    pub fn with_outbound_queue_capacity(mut self, capacity: usize) -> Self {
        self.outbound_queue_capacity = capacity.max(1);
        self
    }

    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    pub fn with_scheduler_tick(mut self, tick: Duration) -> Self {
        self.scheduler_tick = tick;
        self
    }

    pub fn with_health_check_interval(mut self, interval: Duration) -> Self {
        self.health_check_interval = interval;
        self
    }

    pub fn with_snapshot_every(mut self, events: u64) -> Self {
        self.snapshot_every = events.max(1);
        self
    }

    pub fn with_default_settings(mut self, settings: SessionSettings) -> Self {
        self.default_settings = settings;
        self
    }
}

/// Running session host.
///
/// Design: Runtime owns the background tasks; [`SessionRegistry`] (shared
/// through an `Arc`) is the façade clients use to reach sessions.
pub struct Runtime {
    registry: Arc<SessionRegistry>,
    scheduler: PhaseScheduler,
    bus: EventBus,
    shutdown: watch::Sender<bool>,
    scheduler_task: JoinHandle<()>,
    health_task: Option<JoinHandle<()>>,
}

impl Runtime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn scheduler(&self) -> &PhaseScheduler {
        &self.scheduler
    }

    /// Bus behind the default broadcaster. Subscribers see nothing when a
    /// custom broadcaster was installed.
    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    pub async fn create_session(&self, id: impl Into<SessionId>) -> Result<SessionHandle> {
        self.registry.create(id).await
    }

    pub async fn session(&self, id: &SessionId) -> Result<SessionHandle> {
        self.registry.get(id).await
    }

    pub async fn stats(&self) -> RegistryStats {
        self.registry.stats().await
    }

    /// Stops background tasks, then every session, waiting for their
    /// outbound queues to drain.
    pub async fn shutdown(self) -> Result<()> {
        self.shutdown.send_replace(true);

        self.scheduler_task.await.map_err(RuntimeError::WorkerJoin)?;
        if let Some(health) = self.health_task {
            health.await.map_err(RuntimeError::WorkerJoin)?;
        }

        let stopped = self.registry.shutdown_all().await;
        info!(target: "runtime::registry", sessions = stopped, "runtime shut down");
        Ok(())
    }
}

/// Builder for [`Runtime`]. Unset sinks default to in-memory storage and
/// delivery over the runtime's [`EventBus`].
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    events: Option<Arc<dyn EventSink>>,
    snapshots: Option<Arc<dyn SnapshotStore>>,
    broadcaster: Option<Arc<dyn Broadcaster>>,
    catalog: Option<Catalog>,
    modifiers: Option<Arc<dyn ModifierProvider + Send + Sync>>,
    health_monitor: bool,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            events: None,
            snapshots: None,
            broadcaster: None,
            catalog: None,
            modifiers: None,
            health_monitor: true,
        }
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = Some(sink);
        self
    }

    pub fn snapshot_store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.snapshots = Some(store);
        self
    }

    pub fn broadcaster(mut self, broadcaster: Arc<dyn Broadcaster>) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    /// Mandates and crises; defaults to the built-in catalog.
    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn modifiers(mut self, modifiers: Arc<dyn ModifierProvider + Send + Sync>) -> Self {
        self.modifiers = Some(modifiers);
        self
    }

    /// Enable the periodic health check that restarts failed sessions
    /// (default: true).
    pub fn health_monitor(mut self, enable: bool) -> Self {
        self.health_monitor = enable;
        self
    }

    /// Must be called from within a Tokio runtime.
    pub async fn build(self) -> Result<Runtime> {
        self.config.default_settings.validate()?;

        let bus = EventBus::with_capacity(self.config.outbound_queue_capacity);
        let sinks = Sinks::new(
            self.events
                .unwrap_or_else(|| Arc::new(InMemoryEventSink::new())),
            self.snapshots
                .unwrap_or_else(|| Arc::new(InMemorySnapshotStore::new())),
            self.broadcaster
                .unwrap_or_else(|| Arc::new(bus.clone())),
        );

        let scheduler = PhaseScheduler::new();
        let mut registry =
            SessionRegistry::new(self.config.clone(), sinks).with_scheduler(scheduler.clone());
        if let Some(catalog) = self.catalog {
            registry = registry.with_catalog(catalog);
        }
        if let Some(modifiers) = self.modifiers {
            registry = registry.with_modifiers(modifiers);
        }
        let registry = Arc::new(registry);

        let (shutdown, shutdown_rx) = watch::channel(false);
        let scheduler_task = scheduler.spawn(self.config.scheduler_tick, shutdown_rx.clone());
        let health_task = self.health_monitor.then(|| {
            registry.spawn_health_monitor(self.config.health_check_interval, shutdown_rx)
        });

        info!(
            target: "runtime::registry",
            inbound = self.config.inbound_queue_capacity,
            tick_ms = self.config.scheduler_tick.as_millis() as u64,
            health_monitor = self.health_monitor,
            "runtime started"
        );

        Ok(Runtime {
            registry,
            scheduler,
            bus,
            shutdown,
            scheduler_task,
            health_task,
        })
    }
}
