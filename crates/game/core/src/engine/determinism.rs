//! Replay properties: a persisted log rebuilds exactly the live state.
use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use super::SessionEngine;
use crate::action::{Action, ActionKind};
use crate::config::SessionSettings;
use crate::event::Event;
use crate::reducer::{apply_in_place, replay};
use crate::rules::StateModifiers;
use crate::state::{Catalog, GUILTY, PhaseKind, SessionId, SessionState};

const PLAYERS: [&str; 6] = ["ana", "bo", "cy", "dee", "eli", "fay"];

#[derive(Clone, Debug)]
enum Step {
    Advance,
    Vote(usize, usize),
    Mine(usize, usize),
    Convert(usize, usize),
    Say(usize),
}

fn step() -> impl Strategy<Value = Step> {
    let who = 0..PLAYERS.len();
    prop_oneof![
        3 => Just(Step::Advance),
        2 => (who.clone(), who.clone()).prop_map(|(a, b)| Step::Vote(a, b)),
        2 => (who.clone(), who.clone()).prop_map(|(a, b)| Step::Mine(a, b)),
        1 => (who.clone(), who.clone()).prop_map(|(a, b)| Step::Convert(a, b)),
        1 => who.prop_map(Step::Say),
    ]
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

fn to_action(state: &SessionState, step: &Step, at: DateTime<Utc>) -> Action {
    let base = |kind| Action::new(kind, state.id.clone(), at);
    match *step {
        Step::Advance => base(ActionKind::PhaseTransition).field("from_phase", state.phase.kind.as_str()),
        Step::Vote(voter, target) => {
            let choice = if state.phase.kind == PhaseKind::Verdict {
                GUILTY
            } else {
                PLAYERS[target]
            };
            base(ActionKind::SubmitVote).by(PLAYERS[voter]).field("target_id", choice)
        }
        Step::Mine(miner, target) => base(ActionKind::SubmitNightAction)
            .by(PLAYERS[miner])
            .field("action_type", "MINE")
            .field("target_id", PLAYERS[target]),
        Step::Convert(attacker, target) => base(ActionKind::SubmitNightAction)
            .by(PLAYERS[attacker])
            .field("action_type", "CONVERT")
            .field("target_id", PLAYERS[target]),
        Step::Say(speaker) => base(ActionKind::SendMessage)
            .by(PLAYERS[speaker])
            .field("message", "status update"),
    }
}

/// Drives a session the way the runtime does: execute, number, fold.
fn run(seed: u64, steps: &[Step]) -> (SessionState, Vec<Event>) {
    let mut state = SessionState::new(SessionId::from("prop"), SessionSettings::default(), start());
    let mut log = Vec::new();
    let catalog = Catalog::default();

    let mut script: Vec<Action> = PLAYERS
        .iter()
        .map(|id| Action::new(ActionKind::JoinGame, state.id.clone(), start()).by(*id))
        .collect();
    script.push(
        Action::new(ActionKind::InitializeSession, state.id.clone(), start()).field("seed", seed),
    );

    let mut commit = |state: &mut SessionState, action: &Action, at: DateTime<Utc>| {
        let engine = SessionEngine::new(state, &StateModifiers, &catalog);
        let Ok(events) = engine.execute(action, at) else {
            return;
        };
        for mut event in events {
            event.seq = state.last_seq + 1;
            event.id = format!("{}-{}", state.id, event.seq);
            apply_in_place(state, &event);
            log.push(event);
        }
    };

    for action in &script {
        commit(&mut state, action, start());
    }
    for (index, step) in steps.iter().enumerate() {
        let at = start() + Duration::seconds(index as i64 + 1);
        let action = to_action(&state, step, at);
        commit(&mut state, &action, at);
    }
    (state, log)
}

proptest! {
    #[test]
    fn persisted_logs_replay_to_the_live_state(seed in any::<u64>(), steps in prop::collection::vec(step(), 0..80)) {
        let (live, log) = run(seed, &steps);
        let json = serde_json::to_string(&log).unwrap();
        let restored: Vec<Event> = serde_json::from_str(&json).unwrap();
        let origin = SessionState::new(SessionId::from("prop"), SessionSettings::default(), start());
        prop_assert_eq!(replay(origin, &restored), live);
    }

    #[test]
    fn the_same_inputs_produce_the_same_log(seed in any::<u64>(), steps in prop::collection::vec(step(), 0..40)) {
        let (_, first) = run(seed, &steps);
        let (_, second) = run(seed, &steps);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn sequence_numbers_are_gapless(seed in any::<u64>(), steps in prop::collection::vec(step(), 0..40)) {
        let (_, log) = run(seed, &steps);
        for (index, event) in log.iter().enumerate() {
            prop_assert_eq!(event.seq, index as u64 + 1);
        }
    }
}
