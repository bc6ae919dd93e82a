//! Verdict resolution and elimination.
use chrono::{DateTime, Utc};

use crate::engine::Staging;
use crate::event::{Event, EventKind, payloads};
use crate::state::{GUILTY, INNOCENT, VoteKind, VoteState};

use super::modifiers::ModifierProvider;
use super::{kpi, voting};

/// Weighted verdict totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Verdict {
    pub guilty: u32,
    pub innocent: u32,
}

impl Verdict {
    pub fn from_vote(vote: &VoteState) -> Self {
        Self {
            guilty: vote.weight_for(GUILTY),
            innocent: vote.weight_for(INNOCENT),
        }
    }

    /// Guilty must outweigh innocent; under a supermajority it must also
    /// reach two thirds of the cast weight.
    pub fn convicts(self, supermajority: bool) -> bool {
        if self.guilty <= self.innocent {
            return false;
        }
        if supermajority {
            let cast = u64::from(self.guilty) + u64::from(self.innocent);
            return u64::from(self.guilty) * 3 >= cast * 2;
        }
        true
    }
}

/// Closes the verdict vote and eliminates the nominee if convicted.
///
/// Returns whether anyone was eliminated.
pub fn resolve_verdict(
    staging: &mut Staging,
    modifiers: &dyn ModifierProvider,
    now: DateTime<Utc>,
) -> bool {
    let Some(vote) = staging
        .state()
        .vote
        .clone()
        .filter(|vote| vote.kind == VoteKind::Verdict)
    else {
        return false;
    };
    let closing = voting::complete_vote(staging.state(), &vote, now);
    staging.emit(closing);

    let Some(nominee) = staging
        .state()
        .nominee
        .as_ref()
        .and_then(|id| staging.state().alive_player(id.as_str()))
        .cloned()
    else {
        return false;
    };

    let verdict = Verdict::from_vote(&vote);
    if !verdict.convicts(modifiers.supermajority_required(staging.state())) {
        let notice = Event::new(EventKind::SystemMessage, staging.state().id.clone(), now).with(
            &payloads::SystemMessage {
                message: format!("{} has been retained.", nominee.name),
                code: None,
            },
        );
        staging.emit(notice);
        return false;
    }

    // Objectives read the nominee while they are still alive.
    let unanimous = kpi::track_unanimous(staging.state(), &nominee, &vote, now);
    staging.emit_all(unanimous);
    let inquisitors = kpi::track_elimination(staging.state(), &nominee, &vote, now);
    staging.emit_all(inquisitors);

    let eliminated = Event::new(EventKind::PlayerEliminated, staging.state().id.clone(), now)
        .about(&nominee.id)
        .with(&payloads::PlayerEliminated {
            role_type: nominee.role_kind(),
            alignment: nominee.alignment,
            guilty: verdict.guilty,
            innocent: verdict.innocent,
        });
    staging.emit(eliminated);
    true
}
