//! Phase scheduler: turns phase deadlines into transition actions.
//!
//! The scheduler never touches session state. When a timer expires it
//! submits a `PHASE_TRANSITION` action to the session's queue, where it is
//! serialized with player actions like any other intent. Timers are polled
//! on a coarse tick, so a transition fires at or after its deadline.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use alignment_core::{Action, PhaseKind, SessionId, SessionState};

use crate::api::{RuntimeError, SessionHandle};

/// A timer is identified by its session and the phase it ends.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TimerKey {
    pub session: SessionId,
    pub phase: PhaseKind,
}

struct Timer {
    deadline: Instant,
    target: SessionHandle,
}

/// Shared timer table. Cloning yields another handle to the same table.
#[derive(Clone, Default)]
pub struct PhaseScheduler {
    timers: Arc<Mutex<HashMap<TimerKey, Timer>>>,
}

impl PhaseScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the timer ending `phase` after `duration`.
    ///
    /// Re-arming the same key replaces the old timer. Only the current phase
    /// of a session can expire, so the session's other timers are dropped.
    /// Untimed phases (lobby, game over) are not armed.
    pub fn schedule(&self, target: SessionHandle, phase: PhaseKind, duration: Duration) {
        if !phase.is_timed() {
            return;
        }
        let session = target.id().clone();
        let mut timers = self.lock();
        timers.retain(|key, _| key.session != session || key.phase == phase);
        timers.insert(
            TimerKey {
                session: session.clone(),
                phase,
            },
            Timer {
                deadline: Instant::now() + duration,
                target,
            },
        );
        debug!(
            target: "runtime::scheduler",
            session = %session,
            phase = %phase,
            ?duration,
            "timer armed"
        );
    }

    /// Arms the timer for the phase `state` is in, counting the time that
    /// already elapsed since the phase started.
    pub fn schedule_current(&self, target: SessionHandle, state: &SessionState, now: DateTime<Utc>) {
        if state.is_over() {
            return;
        }
        let elapsed = (now - state.phase.started_at).to_std().unwrap_or_default();
        let remaining = state.phase.duration.saturating_sub(elapsed);
        self.schedule(target, state.phase.kind, remaining);
    }

    /// Removes every timer of a session. Returns how many were armed.
    pub fn cancel_all(&self, session: &SessionId) -> usize {
        let mut timers = self.lock();
        let before = timers.len();
        timers.retain(|key, _| &key.session != session);
        let removed = before - timers.len();
        if removed > 0 {
            debug!(target: "runtime::scheduler", session = %session, removed, "timers cancelled");
        }
        removed
    }

    /// Phases with an armed timer for `session`.
    pub fn armed(&self, session: &SessionId) -> Vec<PhaseKind> {
        self.lock()
            .keys()
            .filter(|key| &key.session == session)
            .map(|key| key.phase)
            .collect()
    }

    /// Fires every timer whose deadline is at or before `now`.
    ///
    /// A transition that meets a full queue stays armed and is retried on the
    /// next tick; one whose session is gone is discarded.
    pub fn fire_due(&self, now: Instant) -> usize {
        let due: Vec<(TimerKey, Timer)> = {
            let mut timers = self.lock();
            let keys: Vec<TimerKey> = timers
                .iter()
                .filter(|(_, timer)| timer.deadline <= now)
                .map(|(key, _)| key.clone())
                .collect();
            keys.into_iter()
                .filter_map(|key| timers.remove(&key).map(|timer| (key, timer)))
                .collect()
        };

        let mut fired = 0;
        for (key, timer) in due {
            let Some(next) = key.phase.next() else {
                continue;
            };
            let action = Action::phase_transition(
                key.session.clone(),
                key.phase,
                next,
                Duration::ZERO,
                Utc::now(),
            );
            match timer.target.submit(action) {
                Ok(()) => {
                    fired += 1;
                    debug!(
                        target: "runtime::scheduler",
                        session = %key.session,
                        from = %key.phase,
                        to = %next,
                        "phase timer fired"
                    );
                }
                Err(RuntimeError::QueueFull { .. }) => {
                    warn!(
                        target: "runtime::scheduler",
                        session = %key.session,
                        phase = %key.phase,
                        "queue full, retrying transition next tick"
                    );
                    self.lock().entry(key).or_insert(timer);
                }
                Err(err) => {
                    debug!(
                        target: "runtime::scheduler",
                        session = %key.session,
                        error = %err,
                        "dropping timer for unreachable session"
                    );
                }
            }
        }
        fired
    }

    /// Polls the timer table every `tick` until `shutdown` turns true.
    pub fn spawn(&self, tick: Duration, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let scheduler = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick.max(Duration::from_millis(1)));
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(target: "runtime::scheduler", ?tick, "phase scheduler started");
            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        scheduler.fire_due(Instant::now());
                    }
                }
            }
            info!(target: "runtime::scheduler", "phase scheduler stopped");
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TimerKey, Timer>> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
