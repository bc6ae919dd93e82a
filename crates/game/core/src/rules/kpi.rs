//! Personal objective tracking.
use chrono::{DateTime, Utc};

use crate::event::{Event, EventKind, payloads};
use crate::state::{Alignment, GUILTY, KpiKind, Player, PlayerId, RoleKind, SessionState, VoteState};

/// Tokens paid per correct vote when an Inquisitor objective completes.
pub const INQUISITOR_BONUS_PER_VOTE: u32 = 2;

fn progress(state: &SessionState, player: &PlayerId, kind: KpiKind, value: u32, target: u32, now: DateTime<Utc>) -> Event {
    Event::new(EventKind::KpiProgress, state.id.clone(), now)
        .private_to(player)
        .with(&payloads::KpiUpdate {
            kpi_type: Some(kind),
            progress: value,
            target,
        })
}

fn completed(state: &SessionState, player: &PlayerId, kind: KpiKind, value: u32, target: u32, now: DateTime<Utc>) -> Event {
    Event::new(EventKind::KpiCompleted, state.id.clone(), now)
        .private_to(player)
        .with(&payloads::KpiUpdate {
            kpi_type: Some(kind),
            progress: value,
            target,
        })
}

fn open_kpi(player: &Player, kind: KpiKind) -> Option<(u32, u32)> {
    player
        .kpi
        .as_ref()
        .filter(|kpi| kpi.kind == kind && !kpi.completed)
        .map(|kpi| (kpi.progress, kpi.target))
}

/// Credits human Inquisitors who voted guilty against an aligned player.
pub fn track_elimination(
    state: &SessionState,
    eliminated: &Player,
    verdict: &VoteState,
    now: DateTime<Utc>,
) -> Vec<Event> {
    let mut events = Vec::new();
    if eliminated.alignment != Alignment::Aligned {
        return events;
    }
    for (voter_id, ballot) in &verdict.votes {
        if ballot != GUILTY {
            continue;
        }
        let Some(voter) = state.alive_player(voter_id.as_str()) else {
            continue;
        };
        if voter.alignment != Alignment::Human {
            continue;
        }
        let Some((current, target)) = open_kpi(voter, KpiKind::Inquisitor) else {
            continue;
        };
        let next = current + 1;
        events.push(progress(state, voter_id, KpiKind::Inquisitor, next, target, now));
        if next >= target {
            events.push(completed(state, voter_id, KpiKind::Inquisitor, next, target, now));
            events.push(
                Event::new(EventKind::TokensAwarded, state.id.clone(), now)
                    .about(voter_id)
                    .with(&payloads::TokensChanged {
                        amount: next * INQUISITOR_BONUS_PER_VOTE,
                        reason: "performance bonus".to_owned(),
                    }),
            );
        }
    }
    events
}

/// Completes a Scapegoat objective when every ballot was guilty.
pub fn track_unanimous(
    state: &SessionState,
    eliminated: &Player,
    verdict: &VoteState,
    now: DateTime<Utc>,
) -> Vec<Event> {
    let Some((_, target)) = open_kpi(eliminated, KpiKind::Scapegoat) else {
        return Vec::new();
    };
    let unanimous = !verdict.votes.is_empty() && verdict.votes.values().all(|ballot| ballot == GUILTY);
    if !unanimous {
        return Vec::new();
    }
    vec![completed(state, &eliminated.id, KpiKind::Scapegoat, target, target, now)]
}

/// Guardian objectives advance each morning the CISO is still alive.
pub fn track_night_survival(state: &SessionState, now: DateTime<Utc>) -> Vec<Event> {
    let ciso_alive = state
        .alive_players()
        .any(|player| player.role_kind() == Some(RoleKind::Ciso));
    if !ciso_alive {
        return Vec::new();
    }
    let day = state.day_number;
    let mut events = Vec::new();
    for player in state.alive_players() {
        let Some((_, target)) = open_kpi(player, KpiKind::Guardian) else {
            continue;
        };
        if day >= target {
            events.push(completed(state, &player.id, KpiKind::Guardian, day, target, now));
        } else {
            events.push(progress(state, &player.id, KpiKind::Guardian, day, target, now));
        }
    }
    events
}

/// Objectives judged on the final table.
pub fn evaluate_game_end(state: &SessionState, now: DateTime<Utc>) -> Vec<Event> {
    let humans = state.alive_with(Alignment::Human);
    let richest = {
        let max = state.alive_players().map(|p| p.tokens).max();
        let mut leaders = state.alive_players().filter(|p| Some(p.tokens) == max);
        match (leaders.next(), leaders.next()) {
            (Some(only), None) => Some(only.id.clone()),
            _ => None,
        }
    };

    let mut events = Vec::new();
    for player in state.alive_players() {
        let Some(kpi) = player.kpi.as_ref().filter(|kpi| !kpi.completed) else {
            continue;
        };
        let done = match kpi.kind {
            KpiKind::SuccessionPlanner => humans == 2,
            KpiKind::Capitalist => richest.as_ref() == Some(&player.id),
            _ => false,
        };
        if done {
            events.push(completed(state, &player.id, kpi.kind, kpi.target, kpi.target, now));
        }
    }
    events
}
