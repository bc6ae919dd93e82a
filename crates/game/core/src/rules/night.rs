//! Night resolution pipeline.
//!
//! Intents resolve in fixed passes: blocks, mining, role abilities and
//! milestones, then protection, investigation, and conversion. Every pass reads
//! the staged state, so a block landed in the first pass silences the blocked
//! player's later intents. Within the ability pass isolations land before
//! reviews, and both before any other ability, whatever the actors' ids.
use chrono::{DateTime, Utc};

use crate::engine::Staging;
use crate::event::{Event, EventKind, payloads};
use crate::state::{NightActionKind, PhaseKind, PlayerId, SubmittedNightAction};

use super::abilities;
use super::mining::{self, MiningRequest};
use super::modifiers::ModifierProvider;

/// Resolves every queued intent and emits the night summary.
pub fn resolve(staging: &mut Staging, modifiers: &dyn ModifierProvider, now: DateTime<Utc>) {
    let submitted: Vec<SubmittedNightAction> =
        staging.state().night_actions.values().cloned().collect();
    let total_actions = submitted.len();

    apply_blocks(staging, modifiers, &submitted, now);
    let mining = mine(staging, modifiers, now);
    run_abilities(staging, modifiers, now);
    run_milestones(staging, modifiers, now);
    run_protection(staging, modifiers, now);
    run_investigations(staging, modifiers, now);
    let converted = run_conversions(staging, modifiers, now);

    let state = staging.state();
    let summary = Event::new(EventKind::NightActionsResolved, state.id.clone(), now).with(
        &payloads::NightActionsResolved {
            night_number: state.day_number,
            total_actions,
            blocked_players: state.blocked_tonight.iter().cloned().collect(),
            converted_players: converted,
            mining_results: mining.winners,
            failed_miners: mining.failed,
            next_phase: Some(PhaseKind::Sitrep),
        },
    );
    staging.emit(summary);
}

/// Actions of `kind` as they stand now, skipping blocked or dead actors.
fn current(staging: &Staging, kind: NightActionKind) -> Vec<SubmittedNightAction> {
    let state = staging.state();
    state
        .night_actions
        .values()
        .filter(|action| action.kind == kind)
        .filter(|action| !state.is_blocked(action.player_id.as_str()))
        .filter(|action| state.alive_player(action.player_id.as_str()).is_some())
        .cloned()
        .collect()
}

fn apply_blocks(
    staging: &mut Staging,
    modifiers: &dyn ModifierProvider,
    submitted: &[SubmittedNightAction],
    now: DateTime<Utc>,
) {
    for action in submitted.iter().filter(|a| a.kind == NightActionKind::Block) {
        let state = staging.state();
        let Some(actor) = state.alive_player(action.player_id.as_str()) else {
            continue;
        };
        if state.is_blocked(actor.id.as_str())
            || !actor.role_unlocked()
            || !abilities::meets_threshold(state, modifiers, actor.id.as_str())
        {
            continue;
        }
        let Some(target) = action
            .target_id
            .as_ref()
            .filter(|target| **target != actor.id)
            .filter(|target| state.alive_player(target.as_str()).is_some())
            .filter(|target| !state.is_blocked(target.as_str()))
        else {
            continue;
        };
        let event = Event::new(EventKind::PlayerBlocked, state.id.clone(), now)
            .private_to(target)
            .with(&payloads::PlayerBlocked {
                blocker_id: actor.id.clone(),
                source: Some(NightActionKind::Block),
            });
        staging.emit(event);
    }
}

fn mine(
    staging: &mut Staging,
    modifiers: &dyn ModifierProvider,
    now: DateTime<Utc>,
) -> mining::MiningResult {
    let requests: Vec<MiningRequest> = current(staging, NightActionKind::Mine)
        .into_iter()
        .filter_map(|action| {
            Some(MiningRequest {
                target_id: action.target_id?,
                miner_id: action.player_id,
            })
        })
        .collect();
    let adjustment = modifiers.mining_pool_adjustment(staging.state());
    let result = mining::allocate(staging.state(), &requests, adjustment);

    for (miner, target) in &result.winners {
        let event = Event::new(EventKind::MiningSuccessful, staging.state().id.clone(), now)
            .about(target)
            .with(&payloads::MiningSuccessful {
                miner_id: miner.clone(),
                target_id: target.clone(),
                amount: 1,
            });
        staging.emit(event);
    }
    result
}

/// Abilities that reshape the rest of the night resolve first, in this order.
const LEADING_ABILITIES: [NightActionKind; 2] =
    [NightActionKind::IsolateNode, NightActionKind::PerformanceReview];

fn run_abilities(staging: &mut Staging, modifiers: &dyn ModifierProvider, now: DateTime<Utc>) {
    for leading in LEADING_ABILITIES {
        run_abilities_matching(staging, modifiers, now, |kind| kind == leading);
    }
    run_abilities_matching(staging, modifiers, now, |kind| {
        kind.is_role_ability() && !LEADING_ABILITIES.contains(&kind)
    });
}

fn run_abilities_matching(
    staging: &mut Staging,
    modifiers: &dyn ModifierProvider,
    now: DateTime<Utc>,
    wanted: impl Fn(NightActionKind) -> bool,
) {
    let actors: Vec<PlayerId> = staging.state().night_actions.keys().cloned().collect();
    for id in actors {
        // Re-read: a review may have rewritten this intent, and an isolation
        // may have blocked this actor.
        let state = staging.state();
        if state.is_blocked(id.as_str()) {
            continue;
        }
        let Some(action) = state
            .night_actions
            .get(id.as_str())
            .filter(|action| wanted(action.kind))
            .cloned()
        else {
            continue;
        };
        let events = abilities::resolve(state, modifiers, &action, now);
        staging.emit_all(events);
    }
}

fn run_milestones(staging: &mut Staging, modifiers: &dyn ModifierProvider, now: DateTime<Utc>) {
    for action in current(staging, NightActionKind::ProjectMilestones) {
        let events = abilities::ship_milestone(staging.state(), modifiers, &action.player_id, now);
        staging.emit_all(events);
    }
}

fn run_protection(staging: &mut Staging, modifiers: &dyn ModifierProvider, now: DateTime<Utc>) {
    for action in current(staging, NightActionKind::Protect) {
        let state = staging.state();
        if !abilities::meets_threshold(state, modifiers, action.player_id.as_str()) {
            continue;
        }
        let Some(target) = action
            .target_id
            .as_ref()
            .filter(|target| state.alive_player(target.as_str()).is_some())
        else {
            continue;
        };
        let event = abilities::protect(state, &action.player_id, target, now);
        staging.emit(event);
    }
}

fn run_investigations(staging: &mut Staging, modifiers: &dyn ModifierProvider, now: DateTime<Utc>) {
    for action in current(staging, NightActionKind::Investigate) {
        let state = staging.state();
        if !abilities::meets_threshold(state, modifiers, action.player_id.as_str()) {
            continue;
        }
        let Some(target) = action
            .target_id
            .as_ref()
            .and_then(|target| state.alive_player(target.as_str()))
        else {
            continue;
        };
        let event = abilities::investigate(state, &action.player_id, target, now);
        staging.emit(event);
    }
}

fn run_conversions(
    staging: &mut Staging,
    modifiers: &dyn ModifierProvider,
    now: DateTime<Utc>,
) -> Vec<PlayerId> {
    let mut converted = Vec::new();
    for action in current(staging, NightActionKind::Convert) {
        let state = staging.state();
        let Some(attacker) = state
            .alive_player(action.player_id.as_str())
            .filter(|p| p.is_aligned())
        else {
            continue;
        };
        let Some(target) = action
            .target_id
            .as_ref()
            .and_then(|target| state.alive_player(target.as_str()))
            .filter(|target| !target.is_aligned())
        else {
            continue;
        };
        let events = abilities::convert(state, modifiers, attacker, target, now);
        if events.iter().any(|e| e.kind == EventKind::AiConversionSuccess) {
            converted.push(target.id.clone());
        }
        staging.emit_all(events);
    }
    converted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::StateModifiers;
    use crate::rules::testing::{now, session_with, submit, unlock};
    use crate::state::{Alignment, RoleKind, SessionState};

    fn run(state: &SessionState) -> Staging {
        let mut staging = Staging::new(state);
        resolve(&mut staging, &StateModifiers, now());
        staging
    }

    fn summary(staging: &Staging) -> payloads::NightActionsResolved {
        staging
            .events()
            .last()
            .filter(|e| e.kind == EventKind::NightActionsResolved)
            .map(|e| e.payload_as())
            .unwrap()
    }

    #[test]
    fn a_block_silences_the_target_for_the_rest_of_the_night() {
        let mut state = session_with(&[
            ("a", Alignment::Human, 1),
            ("b", Alignment::Human, 1),
            ("c", Alignment::Human, 1),
            ("x", Alignment::Aligned, 5),
        ]);
        unlock(&mut state, "a", RoleKind::Ciso);
        state.players.get_mut("x").unwrap().ai_equity = 10;
        submit(&mut state, "a", NightActionKind::Block, Some("x"));
        submit(&mut state, "x", NightActionKind::Convert, Some("b"));
        submit(&mut state, "c", NightActionKind::Mine, Some("b"));

        let staging = run(&state);
        assert!(staging.events().iter().all(|e| e.kind != EventKind::AiConversionSuccess));
        let report = summary(&staging);
        assert_eq!(report.blocked_players, vec![PlayerId::from("x")]);
        assert!(report.converted_players.is_empty());
        assert_eq!(staging.state().players["b"].tokens, 2);
        assert!(staging.state().night_actions.is_empty());
    }

    #[test]
    fn blocked_miners_do_not_enter_the_pool() {
        let mut state = session_with(&[
            ("a", Alignment::Human, 1),
            ("b", Alignment::Human, 1),
            ("x", Alignment::Aligned, 1),
        ]);
        unlock(&mut state, "a", RoleKind::Ciso);
        submit(&mut state, "a", NightActionKind::Block, Some("b"));
        submit(&mut state, "b", NightActionKind::Mine, Some("x"));
        let report = summary(&run(&state));
        assert!(report.mining_results.is_empty());
        assert!(report.failed_miners.is_empty());
    }

    #[test]
    fn protection_stops_a_conversion() {
        let mut state = session_with(&[
            ("a", Alignment::Human, 1),
            ("b", Alignment::Human, 1),
            ("x", Alignment::Aligned, 1),
        ]);
        state.players.get_mut("a").unwrap().milestones = 3;
        state.players.get_mut("x").unwrap().ai_equity = 5;
        submit(&mut state, "a", NightActionKind::Protect, Some("b"));
        submit(&mut state, "x", NightActionKind::Convert, Some("b"));

        let staging = run(&state);
        assert_eq!(staging.state().players["b"].alignment, Alignment::Human);
        assert!(summary(&staging).converted_players.is_empty());
    }

    #[test]
    fn an_unprotected_conversion_lands_and_is_reported() {
        let mut state = session_with(&[
            ("a", Alignment::Human, 1),
            ("b", Alignment::Human, 1),
            ("x", Alignment::Aligned, 1),
        ]);
        state.players.get_mut("x").unwrap().ai_equity = 2;
        submit(&mut state, "x", NightActionKind::Convert, Some("b"));
        let staging = run(&state);
        assert_eq!(staging.state().players["b"].alignment, Alignment::Aligned);
        assert_eq!(summary(&staging).converted_players, vec![PlayerId::from("b")]);
    }

    #[test]
    fn performance_review_turns_a_later_intent_into_milestones() {
        let mut state = session_with(&[
            ("a", Alignment::Human, 1),
            ("b", Alignment::Human, 1),
            ("x", Alignment::Aligned, 1),
        ]);
        unlock(&mut state, "a", RoleKind::Ceo);
        state.players.get_mut("b").unwrap().milestones = 3;
        submit(&mut state, "a", NightActionKind::PerformanceReview, Some("b"));
        submit(&mut state, "b", NightActionKind::Investigate, Some("x"));

        let staging = run(&state);
        assert_eq!(staging.state().players["b"].milestones, 4);
        assert!(staging.events().iter().all(|e| e.kind != EventKind::PlayerInvestigated));
    }

    #[test]
    fn isolation_blocks_later_investigations() {
        let mut state = session_with(&[
            ("a", Alignment::Human, 1),
            ("b", Alignment::Human, 1),
            ("x", Alignment::Aligned, 1),
        ]);
        unlock(&mut state, "a", RoleKind::Ciso);
        state.players.get_mut("b").unwrap().milestones = 3;
        submit(&mut state, "a", NightActionKind::IsolateNode, Some("b"));
        submit(&mut state, "b", NightActionKind::Investigate, Some("x"));

        let staging = run(&state);
        assert!(staging.events().iter().all(|e| e.kind != EventKind::PlayerInvestigated));
        assert_eq!(summary(&staging).blocked_players, vec![PlayerId::from("b")]);
    }

    #[test]
    fn failed_miners_are_flagged_for_tomorrow() {
        let mut state = session_with(&[
            ("a", Alignment::Human, 1),
            ("b", Alignment::Human, 2),
            ("c", Alignment::Human, 1),
        ]);
        // One slot for three humans.
        submit(&mut state, "a", NightActionKind::Mine, Some("c"));
        submit(&mut state, "b", NightActionKind::Mine, Some("c"));
        let staging = run(&state);
        let report = summary(&staging);
        assert_eq!(report.failed_miners, vec![PlayerId::from("b")]);
        assert!(staging.state().players["b"].mining_failed_last_night);
        assert!(!staging.state().players["a"].mining_failed_last_night);
    }

    #[test]
    fn isolation_lands_before_abilities_of_earlier_sorted_players() {
        let mut state = session_with(&[
            ("a", Alignment::Human, 1),
            ("b", Alignment::Human, 1),
            ("z", Alignment::Human, 1),
        ]);
        unlock(&mut state, "a", RoleKind::Cto);
        unlock(&mut state, "z", RoleKind::Ciso);
        submit(&mut state, "a", NightActionKind::OverclockServers, Some("b"));
        submit(&mut state, "z", NightActionKind::IsolateNode, Some("a"));

        let staging = run(&state);
        assert!(staging.events().iter().all(|e| e.kind != EventKind::OverclockServers));
        assert!(staging.events().iter().any(|e| e.kind == EventKind::IsolateNode));
        assert_eq!(summary(&staging).blocked_players, vec![PlayerId::from("a")]);
    }

    #[test]
    fn performance_review_rewrites_an_ability_of_an_earlier_sorted_player() {
        let mut state = session_with(&[
            ("a", Alignment::Human, 1),
            ("b", Alignment::Human, 1),
            ("z", Alignment::Human, 1),
        ]);
        unlock(&mut state, "a", RoleKind::Cto);
        unlock(&mut state, "z", RoleKind::Ceo);
        let milestones = state.players["a"].milestones;
        submit(&mut state, "a", NightActionKind::OverclockServers, Some("b"));
        submit(&mut state, "z", NightActionKind::PerformanceReview, Some("a"));

        let staging = run(&state);
        assert!(staging.events().iter().all(|e| e.kind != EventKind::OverclockServers));
        assert_eq!(staging.state().players["a"].milestones, milestones + 1);
    }
}
