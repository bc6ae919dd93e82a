//! Game rules: pure functions from state (and an intent) to events.
//!
//! Nothing here mutates session state. Rules read a [`SessionState`], consult a
//! [`ModifierProvider`] where crises or mandates can change the outcome, and
//! return the events describing what happened. Multi-step procedures such as
//! the night pipeline fold their own intermediate events through a
//! [`crate::engine::Staging`] copy so that later steps observe earlier ones.
pub mod abilities;
pub mod elimination;
pub mod kpi;
pub mod mining;
pub mod modifiers;
pub mod night;
pub mod phases;
pub mod setup;
pub mod victory;
pub mod voting;

#[cfg(test)]
pub(crate) mod testing;

pub use modifiers::{ModifierProvider, PoolAdjustment, StateModifiers};

use chrono::{DateTime, Utc};

use crate::event::{Event, EventKind, payloads};
use crate::state::{Alignment, PlayerId, SessionState};

/// One private notification per living aligned player.
pub(crate) fn faction_notice(state: &SessionState, message: &str, now: DateTime<Utc>) -> Vec<Event> {
    state
        .alive_ids_with(Alignment::Aligned)
        .iter()
        .map(|id| {
            Event::new(EventKind::PrivateNotification, state.id.clone(), now)
                .private_to(id)
                .with(&payloads::SystemMessage {
                    message: message.to_owned(),
                    code: None,
                })
        })
        .collect()
}

/// A system message only `player` sees.
pub(crate) fn private_notice(
    state: &SessionState,
    player: &PlayerId,
    message: &str,
    now: DateTime<Utc>,
) -> Event {
    Event::new(EventKind::SystemMessage, state.id.clone(), now)
        .private_to(player)
        .with(&payloads::SystemMessage {
            message: message.to_owned(),
            code: None,
        })
}
