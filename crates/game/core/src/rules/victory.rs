//! Win conditions.
use chrono::{DateTime, Utc};

use crate::engine::Staging;
use crate::event::{Event, EventKind, payloads};
use crate::state::{Alignment, Faction, SessionState, WinCondition};

use super::kpi;

/// Aligned share of living tokens above which the AI takes over.
pub const SINGULARITY_SHARE: f64 = 0.51;

pub const ELIMINATION: &str = "ELIMINATION";
pub const CONTAINMENT: &str = "CONTAINMENT";
pub const SINGULARITY: &str = "SINGULARITY";

/// The faction that has won, if any. Checked in fixed order: elimination,
/// containment, singularity.
pub fn check(state: &SessionState) -> Option<WinCondition> {
    if state.alive_count() == 0 {
        return None;
    }
    let humans = state.alive_with(Alignment::Human);
    let aligned = state.alive_with(Alignment::Aligned);

    if humans == 0 && aligned > 0 {
        return Some(WinCondition {
            winner: Faction::Ai,
            condition: ELIMINATION.to_owned(),
            description: "Every human has been eliminated or converted.".to_owned(),
        });
    }
    if aligned == 0 && humans > 0 {
        return Some(WinCondition {
            winner: Faction::Humans,
            condition: CONTAINMENT.to_owned(),
            description: "Every aligned agent has been contained.".to_owned(),
        });
    }

    let (aligned_tokens, total_tokens) = state.alive_players().fold((0u64, 0u64), |(a, t), p| {
        let tokens = u64::from(p.tokens);
        if p.is_aligned() {
            (a + tokens, t + tokens)
        } else {
            (a, t + tokens)
        }
    });
    if total_tokens > 0 && aligned_tokens as f64 / total_tokens as f64 > SINGULARITY_SHARE {
        return Some(WinCondition {
            winner: Faction::Ai,
            condition: SINGULARITY.to_owned(),
            description: "The aligned faction controls the majority of tokens.".to_owned(),
        });
    }
    None
}

pub fn victory_event(state: &SessionState, win: &WinCondition, now: DateTime<Utc>) -> Event {
    Event::new(EventKind::VictoryCondition, state.id.clone(), now).with(&payloads::VictoryCondition {
        winner: Some(win.winner),
        condition: win.condition.clone(),
        description: win.description.clone(),
    })
}

/// Ends the game on `staging` if a faction has won: game-end objectives first,
/// then the victory event. Returns whether the game ended.
pub fn conclude(staging: &mut Staging, now: DateTime<Utc>) -> bool {
    if staging.state().is_over() {
        return true;
    }
    let Some(win) = check(staging.state()) else {
        return false;
    };
    let objectives = kpi::evaluate_game_end(staging.state(), now);
    staging.emit_all(objectives);
    let event = victory_event(staging.state(), &win, now);
    staging.emit(event);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::{kill, now, session_with};
    use crate::state::PhaseKind;

    #[test]
    fn no_humans_left_is_an_ai_elimination_win() {
        let mut state = session_with(&[("a", Alignment::Human, 1), ("x", Alignment::Aligned, 1)]);
        kill(&mut state, "a");
        let win = check(&state).unwrap();
        assert_eq!(win.winner, Faction::Ai);
        assert_eq!(win.condition, ELIMINATION);
    }

    #[test]
    fn no_aligned_left_is_containment() {
        let mut state = session_with(&[("a", Alignment::Human, 1), ("x", Alignment::Aligned, 1)]);
        kill(&mut state, "x");
        let win = check(&state).unwrap();
        assert_eq!(win.winner, Faction::Humans);
        assert_eq!(win.condition, CONTAINMENT);
    }

    #[test]
    fn singularity_needs_strictly_more_than_the_share() {
        let state = session_with(&[
            ("a", Alignment::Human, 1),
            ("b", Alignment::Human, 1),
            ("x", Alignment::Aligned, 2),
        ]);
        assert_eq!(check(&state), None);

        let state = session_with(&[
            ("a", Alignment::Human, 1),
            ("b", Alignment::Human, 1),
            ("x", Alignment::Aligned, 3),
        ]);
        assert_eq!(check(&state).unwrap().condition, SINGULARITY);
    }

    #[test]
    fn conclude_moves_the_session_to_game_over() {
        let mut state = session_with(&[("a", Alignment::Human, 1), ("x", Alignment::Aligned, 1)]);
        kill(&mut state, "x");
        let mut staging = Staging::new(&state);
        assert!(conclude(&mut staging, now()));
        assert_eq!(staging.state().phase.kind, PhaseKind::GameOver);
        assert_eq!(
            staging.state().win_condition.as_ref().map(|w| w.winner),
            Some(Faction::Humans)
        );
    }
}
