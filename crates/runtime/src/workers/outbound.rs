//! Outbound worker: persist, then deliver.
//!
//! Runs beside the session actor so storage or transport latency never
//! stalls action processing. Items are handled strictly in the order the
//! actor produced them.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use alignment_core::{Event, SessionId, SessionState};

use crate::api::handle::SessionCounters;
use crate::repository::Sinks;

/// Work handed from the actor to the outbound worker.
pub(crate) enum Outbound {
    /// A committed event: persisted, then delivered.
    Event(Event),
    /// A rejection notice: delivered only, never persisted.
    Notice(Event),
    Snapshot(Box<SessionState>),
}

pub(crate) struct OutboundWorker {
    session: SessionId,
    rx: mpsc::Receiver<Outbound>,
    sinks: Sinks,
    counters: Arc<SessionCounters>,
}

impl OutboundWorker {
    pub(crate) fn new(
        session: SessionId,
        rx: mpsc::Receiver<Outbound>,
        sinks: Sinks,
        counters: Arc<SessionCounters>,
    ) -> Self {
        Self {
            session,
            rx,
            sinks,
            counters,
        }
    }

    /// Drains the queue until the actor drops its sender.
    pub(crate) async fn run(mut self) {
        info!(target: "runtime::outbound", session = %self.session, "outbound worker started");
        while let Some(item) = self.rx.recv().await {
            match item {
                Outbound::Event(event) => {
                    self.persist(&event).await;
                    self.deliver(&event).await;
                }
                Outbound::Notice(event) => self.deliver(&event).await,
                Outbound::Snapshot(state) => self.snapshot(&state).await,
            }
        }
        info!(target: "runtime::outbound", session = %self.session, "outbound worker stopped");
    }

    async fn persist(&self, event: &Event) {
        match self.sinks.events.append_event(&self.session, event).await {
            Ok(()) => SessionCounters::bump(&self.counters.persisted),
            Err(err) => {
                // The event is already folded into state; nothing rolls back.
                SessionCounters::bump(&self.counters.persistence_failures);
                error!(
                    target: "runtime::outbound",
                    session = %self.session,
                    seq = event.seq,
                    kind = %event.kind,
                    error = %err,
                    "failed to persist event, durability gap"
                );
            }
        }
    }

    async fn deliver(&self, event: &Event) {
        let delivered = match event.recipient() {
            Some(player) => {
                self.sinks
                    .broadcaster
                    .send_to_player(&self.session, player, event)
                    .await
            }
            None => {
                self.sinks
                    .broadcaster
                    .broadcast_to_session(&self.session, event)
                    .await
            }
        };
        if let Err(err) = delivered {
            SessionCounters::bump(&self.counters.broadcast_failures);
            error!(
                target: "runtime::outbound",
                session = %self.session,
                seq = event.seq,
                error = %err,
                "failed to deliver event"
            );
        }
    }

    async fn snapshot(&self, state: &SessionState) {
        match self.sinks.snapshots.save_snapshot(state).await {
            Ok(()) => debug!(
                target: "runtime::outbound",
                session = %self.session,
                seq = state.last_seq,
                "snapshot saved"
            ),
            Err(err) => error!(
                target: "runtime::outbound",
                session = %self.session,
                seq = state.last_seq,
                error = %err,
                "failed to save snapshot"
            ),
        }
    }
}
