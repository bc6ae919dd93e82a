//! Session registry and supervisor.
//!
//! The registry owns every live session actor. It creates sessions, hands
//! out their handles, and restarts an actor that faulted by rebuilding its
//! state from the latest snapshot plus the events persisted after it.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use alignment_content::builtin_catalog;
use alignment_core::reducer::replay;
use alignment_core::{Catalog, ModifierProvider, SessionId, SessionSettings, SessionState, StateModifiers};

use crate::api::{Result, RuntimeError, SessionHandle, SessionStatus};
use crate::repository::Sinks;
use crate::runtime::RuntimeConfig;
use crate::scheduler::PhaseScheduler;
use crate::workers::{SessionContext, SpawnedSession, spawn_session};

/// Supervisor counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub active: usize,
    pub failed: usize,
    pub total_restarts: u64,
}

struct SessionEntry {
    handle: SessionHandle,
    actor: JoinHandle<()>,
    outbound: JoinHandle<()>,
}

impl From<SpawnedSession> for SessionEntry {
    fn from(spawned: SpawnedSession) -> Self {
        Self {
            handle: spawned.handle,
            actor: spawned.actor,
            outbound: spawned.outbound,
        }
    }
}

impl SessionEntry {
    /// Running on paper but the task is gone: something escaped the actor.
    fn needs_restart(&self) -> bool {
        match self.handle.status() {
            SessionStatus::Failed => true,
            SessionStatus::Running => self.actor.is_finished(),
            SessionStatus::Stopped => false,
        }
    }
}

pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SessionEntry>>,
    ctx: SessionContext,
    restarts: AtomicU64,
}

impl SessionRegistry {
    /// Registry with the built-in catalog and the standard modifiers.
    pub fn new(config: RuntimeConfig, sinks: Sinks) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ctx: SessionContext {
                config,
                sinks,
                catalog: Arc::new(builtin_catalog()),
                modifiers: Arc::new(StateModifiers),
                scheduler: None,
            },
            restarts: AtomicU64::new(0),
        }
    }

    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.ctx.catalog = Arc::new(catalog);
        self
    }

    pub fn with_modifiers(mut self, modifiers: Arc<dyn ModifierProvider + Send + Sync>) -> Self {
        self.ctx.modifiers = modifiers;
        self
    }

    /// Phase timers are armed on this scheduler. Without one, phases only
    /// move on explicit `PHASE_TRANSITION` actions.
    pub fn with_scheduler(mut self, scheduler: PhaseScheduler) -> Self {
        self.ctx.scheduler = Some(scheduler);
        self
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.ctx.config
    }

    /// Creates a session with the default settings, or returns the running one.
    pub async fn create(&self, id: impl Into<SessionId>) -> Result<SessionHandle> {
        let settings = self.ctx.config.default_settings.clone();
        self.create_with(id, settings).await
    }

    pub async fn create_with(
        &self,
        id: impl Into<SessionId>,
        settings: SessionSettings,
    ) -> Result<SessionHandle> {
        let id = id.into();
        settings.validate()?;

        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get(&id) {
            return Ok(entry.handle.clone());
        }

        let state = SessionState::new(id.clone(), settings, Utc::now());
        let spawned = spawn_session(state, &self.ctx, true);
        let handle = spawned.handle.clone();
        sessions.insert(id.clone(), spawned.into());
        info!(target: "runtime::registry", session = %id, "session created");
        Ok(handle)
    }

    pub async fn get(&self, id: &SessionId) -> Result<SessionHandle> {
        self.sessions
            .read()
            .await
            .get(id)
            .map(|entry| entry.handle.clone())
            .ok_or_else(|| RuntimeError::SessionNotFound(id.clone()))
    }

    pub async fn session_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<_> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Stops a session and forgets it. Its persisted log is left in place.
    pub async fn remove(&self, id: &SessionId) -> Result<()> {
        let entry = self
            .sessions
            .write()
            .await
            .remove(id)
            .ok_or_else(|| RuntimeError::SessionNotFound(id.clone()))?;
        self.stop_entry(id, entry).await;
        info!(target: "runtime::registry", session = %id, "session removed");
        Ok(())
    }

    /// Replaces a session's actor with one rebuilt from persisted data.
    pub async fn restart(&self, id: &SessionId) -> Result<SessionHandle> {
        let entry = self.sessions.write().await.remove(id);
        match entry {
            Some(entry) => self.stop_entry(id, entry).await,
            None => return Err(RuntimeError::SessionNotFound(id.clone())),
        }

        let handle = self.recover(id).await?;
        let total = self.restarts.fetch_add(1, Ordering::Relaxed) + 1;
        warn!(target: "runtime::registry", session = %id, total_restarts = total, "session restarted");
        Ok(handle)
    }

    /// Brings a persisted session back to life: latest snapshot, then the
    /// events logged after it. Returns the running handle if the session is
    /// already live.
    pub async fn recover(&self, id: &SessionId) -> Result<SessionHandle> {
        if let Ok(handle) = self.get(id).await {
            return Ok(handle);
        }

        let snapshot = self.ctx.sinks.snapshots.load_snapshot(id).await?;
        let after = snapshot.as_ref().map_or(0, |state| state.last_seq);
        let events = self.ctx.sinks.events.load_events(id, after).await?;

        let base = match snapshot {
            Some(state) => state,
            None => {
                let Some(first) = events.first() else {
                    return Err(RuntimeError::SessionNotFound(id.clone()));
                };
                SessionState::new(
                    id.clone(),
                    self.ctx.config.default_settings.clone(),
                    first.timestamp,
                )
            }
        };
        let replayed = events.len();
        let state = replay(base, &events);
        debug!(
            target: "runtime::registry",
            session = %id,
            from_seq = after,
            replayed,
            seq = state.last_seq,
            "session state rebuilt"
        );

        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get(id) {
            return Ok(entry.handle.clone());
        }
        let spawned = spawn_session(state, &self.ctx, false);
        let handle = spawned.handle.clone();
        sessions.insert(id.clone(), spawned.into());
        info!(target: "runtime::registry", session = %id, replayed, "session recovered");
        Ok(handle)
    }

    pub async fn stats(&self) -> RegistryStats {
        let sessions = self.sessions.read().await;
        let failed = sessions.values().filter(|entry| entry.needs_restart()).count();
        RegistryStats {
            active: sessions.len() - failed,
            failed,
            total_restarts: self.restarts.load(Ordering::Relaxed),
        }
    }

    /// Restarts every failed session. Returns the ids that came back.
    pub async fn check_health(&self) -> Vec<SessionId> {
        let failed: Vec<SessionId> = self
            .sessions
            .read()
            .await
            .iter()
            .filter(|(_, entry)| entry.needs_restart())
            .map(|(id, _)| id.clone())
            .collect();

        let mut restarted = Vec::with_capacity(failed.len());
        for id in failed {
            match self.restart(&id).await {
                Ok(_) => restarted.push(id),
                Err(err) => {
                    error!(target: "runtime::registry", session = %id, error = %err, "session restart failed");
                }
            }
        }
        restarted
    }

    /// Periodically runs [`check_health`](Self::check_health) until `shutdown`
    /// flips to `true`.
    pub fn spawn_health_monitor(
        self: &Arc<Self>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                tokio::select! {
                    biased;
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        let restarted = registry.check_health().await;
                        if !restarted.is_empty() {
                            info!(target: "runtime::registry", count = restarted.len(), "health check restarted sessions");
                        }
                    }
                }
            }
            debug!(target: "runtime::registry", "health monitor stopped");
        })
    }

    /// Stops every session. Returns how many were running.
    pub async fn shutdown_all(&self) -> usize {
        let drained: Vec<_> = self.sessions.write().await.drain().collect();
        let count = drained.len();
        for (id, entry) in drained {
            self.stop_entry(&id, entry).await;
        }
        info!(target: "runtime::registry", sessions = count, "all sessions stopped");
        count
    }

    /// Signals the actor, disarms its timers, and waits until the outbound
    /// worker has drained everything the actor committed.
    async fn stop_entry(&self, id: &SessionId, entry: SessionEntry) {
        entry.handle.shutdown();
        if let Some(scheduler) = &self.ctx.scheduler {
            scheduler.cancel_all(id);
        }
        if let Err(err) = entry.actor.await {
            warn!(target: "runtime::registry", session = %id, error = %err, "session actor ended abnormally");
        }
        if let Err(err) = entry.outbound.await {
            warn!(target: "runtime::registry", session = %id, error = %err, "outbound worker ended abnormally");
        }
    }
}
