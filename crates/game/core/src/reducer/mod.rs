//! Event application: the only write path into [`SessionState`].
//!
//! Every event kind has one handler. Handlers are total: they project the
//! payload into a typed struct, treat missing fields as defaults, and skip
//! updates that would touch a dead player. Unknown kinds are ignored so that
//! logs written by newer builds still replay.
mod state;

pub use state::{NightReducer, PlayersReducer, StateReducer};

use std::time::Duration;

use crate::event::{Event, EventKind, Visibility, payloads};
use crate::state::{
    Alignment, ChatMessage, Kpi, NightActionKind, Phase, PhaseKind, Player, PulseCheck, Role,
    SessionState, SubmittedNightAction, VoteState, WinCondition,
};

/// Folds one event into `state`, returning the new state.
pub fn apply(mut state: SessionState, event: &Event) -> SessionState {
    apply_in_place(&mut state, event);
    state
}

/// Folds a sequence of events in order.
pub fn replay<'e>(state: SessionState, events: impl IntoIterator<Item = &'e Event>) -> SessionState {
    events.into_iter().fold(state, apply)
}

pub fn apply_in_place(state: &mut SessionState, event: &Event) {
    let mut reducer = StateReducer::new(state);
    match event.kind {
        EventKind::PlayerJoined => player_joined(&mut reducer, event),
        EventKind::PlayerLeft => {
            if let Some(id) = event.subject() {
                reducer.players().kill(id.as_str());
                reducer.night().withdraw(id.as_str());
            }
        }
        EventKind::RoleAssigned => role_assigned(&mut reducer, event),
        EventKind::GameStarted | EventKind::PhaseChanged => phase_changed(&mut reducer, event),
        EventKind::VoteStarted => {
            let payload: payloads::VoteStarted = event.payload_as();
            if let Some(kind) = payload.vote_type {
                reducer.state_mut().vote = Some(VoteState::new(kind));
            }
        }
        EventKind::VoteCast => vote_cast(&mut reducer, event),
        EventKind::VoteCompleted => {
            if let Some(vote) = reducer.vote() {
                vote.complete = true;
            }
        }
        EventKind::PlayerNominated => {
            reducer.state_mut().nominee = event.subject().cloned();
        }
        EventKind::PlayerEliminated => player_eliminated(&mut reducer, event),
        EventKind::TokensAwarded => {
            let payload: payloads::TokensChanged = event.payload_as();
            if let Some(player) = subject_mut(&mut reducer, event) {
                player.tokens = player.tokens.saturating_add(payload.amount);
            }
        }
        EventKind::TokensLost => {
            let payload: payloads::TokensChanged = event.payload_as();
            if let Some(player) = subject_mut(&mut reducer, event) {
                player.tokens = player.tokens.saturating_sub(payload.amount);
            }
        }
        EventKind::MiningSuccessful => {
            let payload: payloads::MiningSuccessful = event.payload_as();
            let target = if payload.target_id.is_empty() {
                event.subject().cloned().unwrap_or_default()
            } else {
                payload.target_id
            };
            if let Some(player) = reducer.players().alive_mut(target.as_str()) {
                player.tokens = player.tokens.saturating_add(payload.amount);
            }
        }
        EventKind::AiEquityChanged => {
            let payload: payloads::AiEquityChanged = event.payload_as();
            if let Some(player) = subject_mut(&mut reducer, event) {
                player.ai_equity = player.ai_equity.saturating_add(payload.amount);
            }
        }
        EventKind::NightActionSubmitted => night_action_submitted(&mut reducer, event),
        EventKind::NightActionsResolved => night_actions_resolved(&mut reducer, event),
        EventKind::PlayerBlocked => {
            if let Some(id) = event.subject() {
                reducer.night().block(id.clone());
            }
        }
        EventKind::PlayerProtected => {
            let payload: payloads::PlayerProtected = event.payload_as();
            if !payload.target_id.is_empty() {
                reducer.night().protect(payload.target_id);
            }
        }
        EventKind::AiConversionSuccess => {
            let payload: payloads::Conversion = event.payload_as();
            if let Some(player) = subject_mut(&mut reducer, event) {
                player.alignment = Alignment::Aligned;
                player.ai_equity = player.ai_equity.saturating_add(payload.equity_gained);
            }
        }
        EventKind::PlayerShocked => {
            let payload: payloads::PlayerShocked = event.payload_as();
            if let Some(player) = subject_mut(&mut reducer, event) {
                player.status_message = payload.shock_type;
            }
        }
        EventKind::ProjectMilestone => {
            let payload: payloads::ProjectMilestone = event.payload_as();
            if let Some(player) = subject_mut(&mut reducer, event) {
                player.milestones = if payload.milestones > 0 {
                    payload.milestones
                } else {
                    player.milestones.saturating_add(1)
                };
            }
        }
        EventKind::RoleAbilityUnlocked => {
            if let Some(role) = subject_mut(&mut reducer, event).and_then(|p| p.role.as_mut()) {
                role.unlocked = true;
            }
        }
        EventKind::RunAudit
        | EventKind::OverclockServers
        | EventKind::IsolateNode
        | EventKind::PerformanceReview
        | EventKind::ReallocateBudget
        | EventKind::Pivot
        | EventKind::DeployHotfix => ability_used(&mut reducer, event),
        EventKind::ChatMessage => chat_message(&mut reducer, event),
        EventKind::SystemMessage => {
            if event.visibility == Visibility::Public {
                let payload: payloads::SystemMessage = event.payload_as();
                reducer.state_mut().chat.push(ChatMessage {
                    id: event.id.clone(),
                    player_id: None,
                    player_name: "System".to_owned(),
                    message: payload.message,
                    timestamp: event.timestamp,
                    is_system: true,
                });
            }
        }
        EventKind::SlackStatusChanged => {
            let payload: payloads::SlackStatusChanged = event.payload_as();
            if let Some(player) = subject_mut(&mut reducer, event) {
                player.slack_status = payload.status;
            }
        }
        EventKind::CrisisTriggered => {
            let payload: payloads::CrisisTriggered = event.payload_as();
            if !payload.crisis.kind.is_empty() {
                let state = reducer.state_mut();
                state.crisis = Some(payload.crisis);
                state.next_crisis = None;
            }
        }
        EventKind::MandateActivated => {
            let payload: payloads::MandateActivated = event.payload_as();
            if !payload.mandate.kind.is_empty() {
                reducer.state_mut().mandate = Some(payload.mandate);
            }
        }
        EventKind::PulseCheckStarted => {
            let payload: payloads::PulseCheckStarted = event.payload_as();
            reducer.state_mut().pulse_check = PulseCheck {
                question: Some(payload.question),
                responses: Default::default(),
            };
        }
        EventKind::PulseCheckSubmitted => {
            let payload: payloads::PulseCheckSubmitted = event.payload_as();
            let Some(id) = event.subject().cloned() else {
                return finish(&mut reducer, event);
            };
            if reducer.state().alive_player(id.as_str()).is_some() {
                reducer
                    .state_mut()
                    .pulse_check
                    .responses
                    .insert(id, payload.response);
            }
        }
        EventKind::KpiProgress | EventKind::KpiCompleted => kpi_update(&mut reducer, event),
        EventKind::VictoryCondition => {
            let payload: payloads::VictoryCondition = event.payload_as();
            let state = reducer.state_mut();
            state.phase = Phase::new(PhaseKind::GameOver, event.timestamp, Duration::ZERO);
            state.vote = None;
            if let Some(winner) = payload.winner {
                state.win_condition = Some(WinCondition {
                    winner,
                    condition: payload.condition,
                    description: payload.description,
                });
            }
        }
        EventKind::PlayerInvestigated | EventKind::PrivateNotification | EventKind::Unknown => {}
    }
    finish(&mut reducer, event);
}

fn finish(reducer: &mut StateReducer<'_>, event: &Event) {
    reducer.record_seq(event.seq);
}

/// The living player an event is about.
fn subject_mut<'r>(reducer: &'r mut StateReducer<'_>, event: &Event) -> Option<&'r mut Player> {
    let id = event.subject()?;
    reducer.state_mut().players.get_mut(id.as_str()).filter(|p| p.alive)
}

fn player_joined(reducer: &mut StateReducer<'_>, event: &Event) {
    let Some(id) = event.subject().cloned() else {
        return;
    };
    let payload: payloads::PlayerJoined = event.payload_as();
    let name = if payload.name.is_empty() {
        id.to_string()
    } else {
        payload.name
    };
    let mut player = Player::new(id, name, event.timestamp, payload.tokens);
    player.job_title = payload.job_title;
    reducer.players().join(player);
}

fn role_assigned(reducer: &mut StateReducer<'_>, event: &Event) {
    let payload: payloads::RoleAssigned = event.payload_as();
    let Some(player) = subject_mut(reducer, event) else {
        return;
    };
    player.alignment = payload.alignment;
    player.ai_equity = payload.ai_equity;
    if let Some(kind) = payload.role_type {
        player.job_title = kind.title().to_owned();
        player.role = Some(Role::new(kind));
    }
    if let Some(kind) = payload.kpi_type {
        player.kpi = Some(Kpi::new(kind));
    }
}

fn phase_changed(reducer: &mut StateReducer<'_>, event: &Event) {
    let payload: payloads::PhaseChanged = event.payload_as();
    let Some(kind) = payload.phase_type else {
        return;
    };
    let state = reducer.state_mut();
    state.phase = Phase::new(kind, event.timestamp, payload.duration);
    if payload.day_number > 0 {
        state.day_number = payload.day_number;
    }
    match kind {
        PhaseKind::Sitrep => state.pulse_check = PulseCheck::default(),
        PhaseKind::PulseCheck => state.sitrep_redaction = None,
        PhaseKind::Night => {
            state.vote = None;
            state.nominee = None;
        }
        _ => {}
    }
}

fn vote_cast(reducer: &mut StateReducer<'_>, event: &Event) {
    let payload: payloads::VoteCast = event.payload_as();
    let Some(voter) = event.subject().cloned() else {
        return;
    };
    if payload.target_id.is_empty() || reducer.state().alive_player(voter.as_str()).is_none() {
        return;
    }
    let alive = reducer.state().alive_count();
    let Some(vote) = reducer.vote() else {
        return;
    };
    if payload.vote_type.is_some_and(|kind| kind != vote.kind) {
        return;
    }
    vote.record(voter, payload.target_id, payload.weight);
    vote.complete = vote.voter_count() >= alive;
}

fn player_eliminated(reducer: &mut StateReducer<'_>, event: &Event) {
    let Some(id) = event.subject().cloned() else {
        return;
    };
    let payload: payloads::PlayerEliminated = event.payload_as();
    let mut players = reducer.players();
    let Some(player) = players.kill(id.as_str()) else {
        return;
    };
    // The reveal is the last write a player ever receives.
    player.alignment = payload.alignment;
    if let Some(kind) = payload.role_type {
        if player.role_kind() != Some(kind) {
            player.role = Some(Role::new(kind));
        }
    }
    reducer.night().withdraw(id.as_str());
}

fn night_action_submitted(reducer: &mut StateReducer<'_>, event: &Event) {
    let payload: payloads::NightActionSubmitted = event.payload_as();
    let (Some(id), Some(kind)) = (event.subject().cloned(), payload.action_type) else {
        return;
    };
    {
        let mut players = reducer.players();
        let Some(player) = players.alive_mut(id.as_str()) else {
            return;
        };
        player.last_night_action = Some(kind);
    }
    reducer.night().submit(SubmittedNightAction {
        player_id: id,
        kind,
        target_id: payload.target_id.filter(|target| !target.is_empty()),
        payload: payload.details,
        submitted_at: event.timestamp,
    });
}

fn night_actions_resolved(reducer: &mut StateReducer<'_>, event: &Event) {
    let payload: payloads::NightActionsResolved = event.payload_as();
    reducer.night().clear();
    let mut players = reducer.players();
    players.for_each_alive(|player| {
        player.has_used_ability = false;
        if payload.failed_miners.contains(&player.id) {
            player.mining_failed_last_night = true;
        } else if payload.mining_results.contains_key(&player.id) {
            player.mining_failed_last_night = false;
        }
    });
}

fn ability_used(reducer: &mut StateReducer<'_>, event: &Event) {
    let payload: payloads::AbilityUsed = event.payload_as();
    if let Some(actor) = reducer.players().alive_mut(payload.actor_id.as_str()) {
        actor.has_used_ability = true;
    }
    match event.kind {
        EventKind::IsolateNode => {
            if let Some(target) = payload.target_id {
                reducer.night().block(target);
            }
        }
        EventKind::PerformanceReview => {
            if let Some(target) = payload.target_id {
                let template = SubmittedNightAction {
                    player_id: target.clone(),
                    kind: NightActionKind::ProjectMilestones,
                    target_id: None,
                    payload: Default::default(),
                    submitted_at: event.timestamp,
                };
                reducer.night().force_milestones(&target, template);
            }
        }
        EventKind::Pivot => {
            reducer.state_mut().next_crisis = payload.chosen_crisis.filter(|c| !c.is_empty());
        }
        EventKind::DeployHotfix => {
            reducer.state_mut().sitrep_redaction = payload.redacted_section;
        }
        _ => {}
    }
}

fn chat_message(reducer: &mut StateReducer<'_>, event: &Event) {
    // Direct messages are delivered but not kept in the shared log.
    if event.visibility == Visibility::Private {
        return;
    }
    let payload: payloads::ChatMessage = event.payload_as();
    let Some(author) = event.subject() else {
        return;
    };
    let Some(player) = reducer.state().alive_player(author.as_str()) else {
        return;
    };
    let player_name = if payload.player_name.is_empty() {
        player.name.clone()
    } else {
        payload.player_name
    };
    let id = if payload.message_id.is_empty() {
        event.id.clone()
    } else {
        payload.message_id
    };
    reducer.state_mut().chat.push(ChatMessage {
        id,
        player_id: Some(author.clone()),
        player_name,
        message: payload.message,
        timestamp: event.timestamp,
        is_system: false,
    });
}

fn kpi_update(reducer: &mut StateReducer<'_>, event: &Event) {
    let payload: payloads::KpiUpdate = event.payload_as();
    let completed = event.kind == EventKind::KpiCompleted;
    let Some(kpi) = subject_mut(reducer, event).and_then(|p| p.kpi.as_mut()) else {
        return;
    };
    if payload.kpi_type.is_some_and(|kind| kind != kpi.kind) {
        return;
    }
    kpi.progress = kpi.progress.max(payload.progress);
    if completed {
        kpi.completed = true;
        kpi.progress = kpi.progress.max(kpi.target);
    }
}
