//! Session actor: the single writer of one session's state.
//!
//! Commands are taken from a bounded inbound queue strictly in arrival
//! order. Each action runs through [`SessionEngine`], every resulting event
//! is numbered and folded into state, and the committed events are handed
//! to the outbound worker. A panic while processing an action is caught
//! here: the session is marked failed and stops, leaving recovery to the
//! registry.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use alignment_core::event::payloads;
use alignment_core::reducer::apply_in_place;
use alignment_core::{
    Action, ActionError, Catalog, Event, EventKind, ModifierProvider, PlayerId, SessionEngine,
    SessionState,
};

use super::{Outbound, OutboundWorker};
use crate::api::handle::{Command, SessionCounters};
use crate::api::{SessionHandle, SessionStatus};
use crate::repository::Sinks;
use crate::runtime::RuntimeConfig;
use crate::scheduler::PhaseScheduler;

/// Collaborators shared by every session of a registry.
#[derive(Clone)]
pub(crate) struct SessionContext {
    pub(crate) config: RuntimeConfig,
    pub(crate) sinks: Sinks,
    pub(crate) catalog: Arc<Catalog>,
    pub(crate) modifiers: Arc<dyn ModifierProvider + Send + Sync>,
    pub(crate) scheduler: Option<PhaseScheduler>,
}

/// A running session: its handle and the two tasks behind it.
pub(crate) struct SpawnedSession {
    pub(crate) handle: SessionHandle,
    pub(crate) actor: JoinHandle<()>,
    pub(crate) outbound: JoinHandle<()>,
}

/// Starts the actor and outbound worker for `state`.
///
/// With `snapshot_first`, the initial state is snapshotted before any event
/// so that a later restart has a base to replay onto. A state that is
/// mid-phase gets its phase timer re-armed for the time that remains.
pub(crate) fn spawn_session(
    state: SessionState,
    ctx: &SessionContext,
    snapshot_first: bool,
) -> SpawnedSession {
    let id = state.id.clone();
    let (command_tx, command_rx) = mpsc::channel(ctx.config.inbound_queue_capacity.max(1));
    let (outbound_tx, outbound_rx) = mpsc::channel(ctx.config.outbound_queue_capacity.max(1));
    let (status_tx, status_rx) = watch::channel(SessionStatus::Running);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let counters = Arc::new(SessionCounters::default());

    let handle = SessionHandle::new(
        id.clone(),
        command_tx,
        status_rx,
        Arc::new(shutdown_tx),
        Arc::clone(&counters),
        ctx.config.reply_timeout,
    );

    if snapshot_first
        && outbound_tx
            .try_send(Outbound::Snapshot(Box::new(state.clone())))
            .is_err()
    {
        debug!(target: "runtime::session", session = %id, "initial snapshot not queued");
    }
    if let Some(scheduler) = &ctx.scheduler
        && state.phase.kind.is_timed()
    {
        scheduler.schedule_current(handle.clone(), &state, Utc::now());
    }

    let worker = OutboundWorker::new(id, outbound_rx, ctx.sinks.clone(), Arc::clone(&counters));
    let outbound = tokio::spawn(worker.run());

    let actor = SessionActor {
        state,
        ctx: ctx.clone(),
        handle: handle.clone(),
        command_rx,
        outbound_tx,
        status_tx,
        shutdown_rx,
        counters,
        since_snapshot: 0,
    };
    let actor = tokio::spawn(actor.run());

    SpawnedSession {
        handle,
        actor,
        outbound,
    }
}

/// Raised when an action escaped the rules with a panic.
struct Fault(String);

struct SessionActor {
    state: SessionState,
    ctx: SessionContext,
    /// Own handle, passed to the scheduler so timers can reach this queue.
    handle: SessionHandle,
    command_rx: mpsc::Receiver<Command>,
    outbound_tx: mpsc::Sender<Outbound>,
    status_tx: watch::Sender<SessionStatus>,
    shutdown_rx: watch::Receiver<bool>,
    counters: Arc<SessionCounters>,
    since_snapshot: u64,
}

impl SessionActor {
    async fn run(mut self) {
        info!(
            target: "runtime::session",
            session = %self.state.id,
            phase = %self.state.phase.kind,
            seq = self.state.last_seq,
            "session actor started"
        );

        loop {
            tokio::select! {
                biased;
                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        break;
                    }
                }
                command = self.command_rx.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    if let Err(Fault(reason)) = self.handle_command(command).await {
                        error!(
                            target: "runtime::session",
                            session = %self.state.id,
                            seq = self.state.last_seq,
                            %reason,
                            "session actor faulted"
                        );
                        self.status_tx.send_replace(SessionStatus::Failed);
                        return;
                    }
                }
            }
        }

        self.status_tx.send_replace(SessionStatus::Stopped);
        info!(target: "runtime::session", session = %self.state.id, "session actor stopped");
    }

    async fn handle_command(&mut self, command: Command) -> Result<(), Fault> {
        match command {
            Command::Submit(action) => {
                // No caller waits; rejections were already logged and sent to the player.
                if let Ok(events) = self.process(&action).await? {
                    debug!(
                        target: "runtime::session",
                        session = %self.state.id,
                        produced = events.len(),
                        "submitted action committed"
                    );
                }
            }
            Command::Post { action, reply } => {
                let outcome = self.process(&action).await?;
                if reply.send(outcome).is_err() {
                    debug!(target: "runtime::session", session = %self.state.id, "post reply dropped (caller gone)");
                }
            }
            Command::Query { reply } => {
                if reply.send(self.state.clone()).is_err() {
                    debug!(target: "runtime::session", session = %self.state.id, "query reply dropped (caller gone)");
                }
            }
        }
        Ok(())
    }

    async fn process(&mut self, action: &Action) -> Result<Result<Vec<Event>, ActionError>, Fault> {
        let now = Utc::now();
        debug!(
            target: "runtime::session",
            session = %self.state.id,
            action = ?action.kind,
            player = ?action.player_id,
            "processing action"
        );

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.commit(action, now)))
            .map_err(|payload| Fault(panic_message(payload.as_ref())))?;
        SessionCounters::bump(&self.counters.processed);

        match &outcome {
            Ok(events) => self.forward(events).await,
            Err(err) => {
                warn!(
                    target: "runtime::session",
                    session = %self.state.id,
                    action = ?action.kind,
                    player = ?action.player_id,
                    error = %err,
                    "action rejected"
                );
                if let Some(player) = &action.player_id {
                    self.notify_rejection(player, err, now).await;
                }
            }
        }
        Ok(outcome)
    }

    /// Runs the rules and folds each produced event into state.
    fn commit(&mut self, action: &Action, now: DateTime<Utc>) -> Result<Vec<Event>, ActionError> {
        let produced = {
            let engine = SessionEngine::new(
                &self.state,
                self.ctx.modifiers.as_ref(),
                self.ctx.catalog.as_ref(),
            );
            engine.execute(action, now)?
        };

        let mut committed = Vec::with_capacity(produced.len());
        for mut event in produced {
            event.seq = self.state.last_seq + 1;
            event.id = format!("{}-{}", self.state.id, event.seq);
            apply_in_place(&mut self.state, &event);
            committed.push(event);
        }
        Ok(committed)
    }

    /// Hands committed events to the outbound worker and keeps the phase
    /// timer and snapshots in step with the new state.
    async fn forward(&mut self, events: &[Event]) {
        if events.is_empty() {
            return;
        }
        for event in events {
            self.send_outbound(Outbound::Event(event.clone())).await;
        }
        self.since_snapshot += events.len() as u64;

        let phase_moved = events
            .iter()
            .any(|e| matches!(e.kind, EventKind::PhaseChanged | EventKind::GameStarted));
        if let Some(scheduler) = &self.ctx.scheduler {
            if self.state.is_over() {
                scheduler.cancel_all(&self.state.id);
            } else if phase_moved {
                scheduler.schedule(
                    self.handle.clone(),
                    self.state.phase.kind,
                    self.state.phase.duration,
                );
            }
        }

        let game_ended = events.iter().any(|e| e.kind == EventKind::VictoryCondition);
        if game_ended {
            info!(
                target: "runtime::session",
                session = %self.state.id,
                winner = ?self.state.win_condition.as_ref().map(|w| w.winner),
                "game over"
            );
        }
        if game_ended || self.since_snapshot >= self.ctx.config.snapshot_every.max(1) {
            self.since_snapshot = 0;
            self.send_outbound(Outbound::Snapshot(Box::new(self.state.clone())))
                .await;
        }
    }

    async fn notify_rejection(&self, player: &PlayerId, err: &ActionError, now: DateTime<Utc>) {
        let notice = Event::new(EventKind::SystemMessage, self.state.id.clone(), now)
            .private_to(player)
            .with(&payloads::SystemMessage {
                message: err.to_string(),
                code: Some(err.code().to_owned()),
            });
        self.send_outbound(Outbound::Notice(notice)).await;
    }

    async fn send_outbound(&self, item: Outbound) {
        if self.outbound_tx.send(item).await.is_err() {
            error!(
                target: "runtime::outbound",
                session = %self.state.id,
                "outbound worker is gone, dropping output"
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned())
}
