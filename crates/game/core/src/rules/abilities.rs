//! Night action eligibility and role ability effects.
//!
//! Submission checks run when the intent is queued; resolution re-checks
//! eligibility against the state at that point of the night and silently
//! skips intents that no longer qualify.
use chrono::{DateTime, Utc};

use crate::error::ActionError;
use crate::event::{Event, EventKind, payloads};
use crate::state::{NightActionKind, PhaseKind, Player, PlayerId, SessionState, SubmittedNightAction};

use super::mining;
use super::modifiers::ModifierProvider;
use super::{faction_notice, private_notice};

/// Section of the next report a hotfix redacts when none is named.
pub const DEFAULT_REDACTED_SECTION: &str = "mining_results";

/// Checks a night intent before it is stored.
pub fn check_submission(
    state: &SessionState,
    modifiers: &dyn ModifierProvider,
    actor: &PlayerId,
    kind: NightActionKind,
    target: Option<&PlayerId>,
) -> Result<(), ActionError> {
    if state.phase.kind != PhaseKind::Night {
        return Err(ActionError::WrongPhase {
            action: "night actions",
            phase: state.phase.kind,
        });
    }
    let player = living(state, actor)?;

    if kind.requires_target() {
        let target = target.ok_or(ActionError::MissingTarget)?;
        if kind == NightActionKind::Mine {
            return mining::validate_request(state, actor, target);
        }
        if target == actor {
            return Err(ActionError::SelfTarget);
        }
        if state.alive_player(target.as_str()).is_none() {
            return Err(ActionError::TargetDead(target.clone()));
        }
    }

    match kind {
        NightActionKind::Mine => Ok(()),
        NightActionKind::Convert => {
            if player.is_aligned() {
                Ok(())
            } else {
                Err(ActionError::NotAligned)
            }
        }
        NightActionKind::Block => {
            if !player.role_unlocked() {
                return Err(ActionError::AbilityLocked);
            }
            check_milestones(state, modifiers, player)
        }
        NightActionKind::Investigate | NightActionKind::Protect => {
            check_milestones(state, modifiers, player)
        }
        NightActionKind::ProjectMilestones => Ok(()),
        ability => check_role_ability(state, modifiers, player, ability),
    }
}

fn living<'s>(state: &'s SessionState, id: &PlayerId) -> Result<&'s Player, ActionError> {
    let player = state
        .player(id.as_str())
        .ok_or_else(|| ActionError::PlayerNotFound(id.clone()))?;
    if !player.alive {
        return Err(ActionError::ActorDead);
    }
    Ok(player)
}

fn check_milestones(
    state: &SessionState,
    modifiers: &dyn ModifierProvider,
    player: &Player,
) -> Result<(), ActionError> {
    let required = modifiers.milestones_required(state);
    if player.milestones < required {
        return Err(ActionError::InsufficientMilestones { required });
    }
    Ok(())
}

/// Role, unlock, milestone, and once-per-night checks for a role ability.
pub fn check_role_ability(
    state: &SessionState,
    modifiers: &dyn ModifierProvider,
    player: &Player,
    ability: NightActionKind,
) -> Result<(), ActionError> {
    if player.role_kind().and_then(|role| role.ability()) != Some(ability) {
        return Err(ActionError::AbilityNotGranted);
    }
    if !player.role_unlocked() {
        return Err(ActionError::AbilityLocked);
    }
    check_milestones(state, modifiers, player)?;
    if player.has_used_ability {
        return Err(ActionError::AbilityAlreadyUsed);
    }
    if modifiers.abilities_disabled(state) {
        return Err(ActionError::AbilitiesSuspended);
    }
    Ok(())
}

/// Whether a player may still perform a milestone-gated action right now.
pub fn meets_threshold(state: &SessionState, modifiers: &dyn ModifierProvider, id: &str) -> bool {
    state
        .alive_player(id)
        .is_some_and(|player| check_milestones(state, modifiers, player).is_ok())
}

/// Resolves one role ability. Returns no events when the intent no longer
/// qualifies.
pub fn resolve(
    state: &SessionState,
    modifiers: &dyn ModifierProvider,
    action: &SubmittedNightAction,
    now: DateTime<Utc>,
) -> Vec<Event> {
    let Some(actor) = state.alive_player(action.player_id.as_str()) else {
        return Vec::new();
    };
    if check_role_ability(state, modifiers, actor, action.kind).is_err() {
        return Vec::new();
    }
    let target = action
        .target_id
        .as_ref()
        .and_then(|id| state.alive_player(id.as_str()));

    match action.kind {
        NightActionKind::RunAudit => target.map_or_else(Vec::new, |t| run_audit(state, actor, t, now)),
        NightActionKind::OverclockServers => {
            target.map_or_else(Vec::new, |t| overclock(state, actor, t, now))
        }
        NightActionKind::IsolateNode => {
            target.map_or_else(Vec::new, |t| isolate(state, actor, t, now))
        }
        NightActionKind::PerformanceReview => target.map_or_else(Vec::new, |t| {
            vec![ability_event(state, EventKind::PerformanceReview, now, payloads::AbilityUsed {
                actor_id: actor.id.clone(),
                target_id: Some(t.id.clone()),
                message: format!("{} has been placed under performance review.", t.name),
                ..Default::default()
            })]
        }),
        NightActionKind::ReallocateBudget => reallocate(state, actor, action, now),
        NightActionKind::Pivot => {
            let chosen: payloads::AbilityUsed = crate::event::project(&action.payload);
            vec![ability_event(state, EventKind::Pivot, now, payloads::AbilityUsed {
                actor_id: actor.id.clone(),
                chosen_crisis: chosen.chosen_crisis.clone(),
                message: "Leadership has pivoted. Tomorrow's crisis has been chosen.".to_owned(),
                ..Default::default()
            })]
        }
        NightActionKind::DeployHotfix => {
            let chosen: payloads::AbilityUsed = crate::event::project(&action.payload);
            let section = chosen
                .redacted_section
                .filter(|section| !section.is_empty())
                .unwrap_or_else(|| DEFAULT_REDACTED_SECTION.to_owned());
            vec![ability_event(state, EventKind::DeployHotfix, now, payloads::AbilityUsed {
                actor_id: actor.id.clone(),
                message: format!("A hotfix has redacted the {section} section of the next report."),
                redacted_section: Some(section),
                ..Default::default()
            })]
        }
        _ => Vec::new(),
    }
}

fn ability_event(
    state: &SessionState,
    kind: EventKind,
    now: DateTime<Utc>,
    payload: payloads::AbilityUsed,
) -> Event {
    Event::new(kind, state.id.clone(), now).with(&payload)
}

fn run_audit(state: &SessionState, actor: &Player, target: &Player, now: DateTime<Utc>) -> Vec<Event> {
    // The public result always clears the target; only the aligned faction
    // learns the truth.
    let mut events = vec![ability_event(state, EventKind::RunAudit, now, payloads::AbilityUsed {
        actor_id: actor.id.clone(),
        target_id: Some(target.id.clone()),
        message: format!("Audit complete: {} is not corrupt.", target.name),
        ..Default::default()
    })];
    events.extend(faction_notice(
        state,
        &format!("Audit of {} found alignment {}.", target.name, target.alignment),
        now,
    ));
    events
}

fn overclock(state: &SessionState, actor: &Player, target: &Player, now: DateTime<Utc>) -> Vec<Event> {
    let mut events = vec![ability_event(
        state,
        EventKind::OverclockServers,
        now,
        payloads::AbilityUsed {
            actor_id: actor.id.clone(),
            target_id: Some(target.id.clone()),
            message: format!(
                "Infrastructure is overclocking. The CTO mines for themselves and for {}.",
                target.name
            ),
            ..Default::default()
        },
    )];
    for id in [&actor.id, &target.id] {
        events.push(
            Event::new(EventKind::TokensAwarded, state.id.clone(), now)
                .about(id)
                .with(&payloads::TokensChanged {
                    amount: 1,
                    reason: "overclocked servers".to_owned(),
                }),
        );
    }
    if actor.is_aligned() {
        events.push(
            Event::new(EventKind::AiEquityChanged, state.id.clone(), now)
                .private_to(&target.id)
                .with(&payloads::AiEquityChanged {
                    amount: 2,
                    source_id: actor.id.clone(),
                }),
        );
    }
    events
}

fn isolate(state: &SessionState, actor: &Player, target: &Player, now: DateTime<Utc>) -> Vec<Event> {
    let message = format!("{} has been isolated from the network tonight.", target.name);
    if actor.is_aligned() && target.is_aligned() {
        // Fizzles: the public report looks the same but no block lands.
        let mut events = vec![ability_event(state, EventKind::IsolateNode, now, payloads::AbilityUsed {
            actor_id: actor.id.clone(),
            message,
            ..Default::default()
        })];
        events.extend(faction_notice(
            state,
            &format!("Isolation of {} was quietly rerouted.", target.name),
            now,
        ));
        return events;
    }
    vec![ability_event(state, EventKind::IsolateNode, now, payloads::AbilityUsed {
        actor_id: actor.id.clone(),
        target_id: Some(target.id.clone()),
        message,
        ..Default::default()
    })]
}

fn reallocate(
    state: &SessionState,
    actor: &Player,
    action: &SubmittedNightAction,
    now: DateTime<Utc>,
) -> Vec<Event> {
    let extras: payloads::AbilityUsed = crate::event::project(&action.payload);
    let (Some(source_id), Some(target_id)) = (extras.source_id, action.target_id.as_ref()) else {
        return Vec::new();
    };
    let (Some(source), Some(target)) = (
        state.alive_player(source_id.as_str()),
        state.alive_player(target_id.as_str()),
    ) else {
        return Vec::new();
    };
    if source.id == target.id || source.tokens == 0 {
        return Vec::new();
    }
    vec![
        ability_event(state, EventKind::ReallocateBudget, now, payloads::AbilityUsed {
            actor_id: actor.id.clone(),
            source_id: Some(source.id.clone()),
            target_id: Some(target.id.clone()),
            message: format!("Budget reallocated from {} to {}.", source.name, target.name),
            ..Default::default()
        }),
        Event::new(EventKind::TokensLost, state.id.clone(), now)
            .about(&source.id)
            .with(&payloads::TokensChanged {
                amount: 1,
                reason: "budget reallocation".to_owned(),
            }),
        Event::new(EventKind::TokensAwarded, state.id.clone(), now)
            .about(&target.id)
            .with(&payloads::TokensChanged {
                amount: 1,
                reason: "budget reallocation".to_owned(),
            }),
    ]
}

/// Grants one milestone, unlocking the role when the requirement is reached.
pub fn ship_milestone(
    state: &SessionState,
    modifiers: &dyn ModifierProvider,
    id: &PlayerId,
    now: DateTime<Utc>,
) -> Vec<Event> {
    let Some(player) = state.alive_player(id.as_str()) else {
        return Vec::new();
    };
    let milestones = player.milestones.saturating_add(1);
    let mut events = vec![
        Event::new(EventKind::ProjectMilestone, state.id.clone(), now)
            .about(id)
            .with(&payloads::ProjectMilestone { milestones }),
    ];
    if let Some(role) = player.role.as_ref().filter(|role| !role.unlocked) {
        if milestones >= modifiers.milestones_required(state) {
            events.push(
                Event::new(EventKind::RoleAbilityUnlocked, state.id.clone(), now)
                    .private_to(id)
                    .with(&payloads::RoleAbilityUnlocked {
                        role_type: Some(role.kind),
                        ability: role.kind.ability(),
                    }),
            );
        }
    }
    events
}

/// Private investigation result for the investigator.
pub fn investigate(state: &SessionState, investigator: &PlayerId, target: &Player, now: DateTime<Utc>) -> Event {
    Event::new(EventKind::PlayerInvestigated, state.id.clone(), now)
        .private_to(investigator)
        .with(&payloads::PlayerInvestigated {
            investigator_id: investigator.clone(),
            target_id: target.id.clone(),
            target_name: target.name.clone(),
            alignment: target.alignment,
            role: target.role_kind(),
        })
}

pub fn protect(state: &SessionState, protector: &PlayerId, target: &PlayerId, now: DateTime<Utc>) -> Event {
    Event::new(EventKind::PlayerProtected, state.id.clone(), now)
        .private_to(protector)
        .with(&payloads::PlayerProtected {
            protector_id: protector.clone(),
            target_id: target.clone(),
        })
}

/// Attempts a conversion. Succeeds iff the attacker's equity plus any crisis
/// bonus strictly exceeds the target's tokens.
pub fn convert(
    state: &SessionState,
    modifiers: &dyn ModifierProvider,
    attacker: &Player,
    target: &Player,
    now: DateTime<Utc>,
) -> Vec<Event> {
    if let Some(reason) = modifiers.conversion_blocked(state) {
        return vec![private_notice(state, &attacker.id, &reason, now)];
    }
    if state.is_protected(target.id.as_str()) || state.is_blocked(target.id.as_str()) {
        return vec![private_notice(
            state,
            &attacker.id,
            "Conversion attempt blocked by protection",
            now,
        )];
    }
    let bonus = modifiers.ai_equity_bonus(state);
    let equity = attacker.ai_equity.saturating_add(bonus);
    if equity > target.tokens {
        return vec![
            Event::new(EventKind::AiConversionSuccess, state.id.clone(), now)
                .private_to(&target.id)
                .with(&payloads::Conversion {
                    converter_id: attacker.id.clone(),
                    target_id: target.id.clone(),
                    equity_gained: 1 + bonus,
                }),
        ];
    }
    vec![
        Event::new(EventKind::PlayerShocked, state.id.clone(), now)
            .about(&target.id)
            .with(&payloads::PlayerShocked {
                converter_id: PlayerId::default(),
                shock_type: "ACTION_LOCK".to_owned(),
                reason: "System shock from failed conversion".to_owned(),
            }),
    ]
}
