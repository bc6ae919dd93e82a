//! Phase transitions and the hooks that run on entering each phase.
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::engine::Staging;
use crate::event::{Event, EventKind, payloads};
use crate::state::{Catalog, PhaseKind, VoteKind};

use super::modifiers::ModifierProvider;
use super::{elimination, kpi, night, victory, voting};

/// Questions asked at the daily pulse check, rotated by day.
pub const PULSE_QUESTIONS: [&str; 5] = [
    "How confident are you in leadership's AI strategy?",
    "Which department is most at risk of automation?",
    "Who on the team has been quietest this week?",
    "Rate the company's alignment posture from 1 to 5.",
    "What should the board prioritise next quarter?",
];

pub fn pulse_question(day: u32) -> &'static str {
    PULSE_QUESTIONS[day as usize % PULSE_QUESTIONS.len()]
}

/// A requested move to another phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    /// Phase the request was made for; `None` accepts any current phase.
    pub from: Option<PhaseKind>,
    /// Target phase; `None` means the next phase of the cycle.
    pub next: Option<PhaseKind>,
    /// Length of the new phase; zero uses the configured duration.
    pub duration: Duration,
}

/// Runs the entry hooks of the target phase and emits `PHASE_CHANGED`.
///
/// Stale requests (whose source is no longer the current phase) and requests
/// against a finished game produce nothing. When a hook ends the game the
/// phase change is not emitted; the victory event already moved the session
/// to game over.
pub fn advance(
    staging: &mut Staging,
    modifiers: &dyn ModifierProvider,
    catalog: &Catalog,
    request: Transition,
    now: DateTime<Utc>,
) {
    let current = staging.state().phase.kind;
    if staging.state().is_over() || request.from.is_some_and(|from| from != current) {
        return;
    }
    let Some(next) = request.next.or_else(|| current.next()) else {
        return;
    };
    if next == PhaseKind::Lobby || next == PhaseKind::GameOver {
        return;
    }

    let mut day = staging.state().day_number;
    match next {
        PhaseKind::Extension => open_vote(staging, VoteKind::Extension, now),
        PhaseKind::Nomination => {
            close_vote(staging, VoteKind::Extension, now);
            open_vote(staging, VoteKind::Nomination, now);
        }
        PhaseKind::Trial => put_on_trial(staging, now),
        PhaseKind::Verdict => {
            if staging.state().nominee.is_some() {
                open_vote(staging, VoteKind::Verdict, now);
            }
        }
        PhaseKind::Night => {
            elimination::resolve_verdict(staging, modifiers, now);
            if victory::conclude(staging, now) {
                return;
            }
        }
        PhaseKind::Sitrep => {
            if current == PhaseKind::Night {
                night::resolve(staging, modifiers, now);
                let guardians = kpi::track_night_survival(staging.state(), now);
                staging.emit_all(guardians);
                if victory::conclude(staging, now) {
                    return;
                }
                day = day.saturating_add(1);
            }
            trigger_queued_crisis(staging, catalog, now);
        }
        PhaseKind::PulseCheck => {
            let event = Event::new(EventKind::PulseCheckStarted, staging.state().id.clone(), now)
                .with(&payloads::PulseCheckStarted {
                    question: pulse_question(day).to_owned(),
                });
            staging.emit(event);
        }
        PhaseKind::Discussion | PhaseKind::Lobby | PhaseKind::GameOver => {}
    }

    let duration = if request.duration.is_zero() {
        staging
            .state()
            .settings
            .phase_durations
            .of(next)
            .unwrap_or_default()
    } else {
        request.duration
    };
    let event = Event::new(EventKind::PhaseChanged, staging.state().id.clone(), now).with(
        &payloads::PhaseChanged {
            phase_type: Some(next),
            previous_phase: Some(current),
            duration,
            day_number: day,
        },
    );
    staging.emit(event);
}

fn open_vote(staging: &mut Staging, kind: VoteKind, now: DateTime<Utc>) {
    let event = voting::start_vote(staging.state(), kind, now);
    staging.emit(event);
}

fn close_vote(staging: &mut Staging, kind: VoteKind, now: DateTime<Utc>) {
    let Some(vote) = staging.state().vote.clone().filter(|vote| vote.kind == kind) else {
        return;
    };
    let event = voting::complete_vote(staging.state(), &vote, now);
    staging.emit(event);
}

/// Closes the nomination and puts a clear winner on trial.
fn put_on_trial(staging: &mut Staging, now: DateTime<Utc>) {
    let Some(vote) = staging
        .state()
        .vote
        .clone()
        .filter(|vote| vote.kind == VoteKind::Nomination)
    else {
        return;
    };
    let closing = voting::complete_vote(staging.state(), &vote, now);
    staging.emit(closing);

    let result = voting::outcome(&vote);
    let Some(nominee) = result
        .winner
        .as_deref()
        .and_then(|winner| staging.state().alive_player(winner))
        .map(|player| player.id.clone())
    else {
        return;
    };
    let event = Event::new(EventKind::PlayerNominated, staging.state().id.clone(), now)
        .about(&nominee)
        .with(&payloads::PlayerNominated {
            votes: result.weight,
        });
    staging.emit(event);
}

fn trigger_queued_crisis(staging: &mut Staging, catalog: &Catalog, now: DateTime<Utc>) {
    let Some(crisis) = staging
        .state()
        .next_crisis
        .as_deref()
        .and_then(|kind| catalog.crisis(kind))
        .cloned()
    else {
        return;
    };
    let event = Event::new(EventKind::CrisisTriggered, staging.state().id.clone(), now)
        .with(&payloads::CrisisTriggered { crisis });
    staging.emit(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::StateModifiers;
    use crate::rules::testing::{at_phase, now, session_with, submit};
    use crate::state::{
        Alignment, Crisis, CrisisEffects, GUILTY, NightActionKind, PlayerId, SessionState,
        VoteState,
    };

    fn step(state: &SessionState, from: Option<PhaseKind>) -> Staging {
        let mut staging = Staging::new(state);
        advance(
            &mut staging,
            &StateModifiers,
            &Catalog::default(),
            Transition {
                from,
                next: None,
                duration: Duration::ZERO,
            },
            now(),
        );
        staging
    }

    fn table() -> SessionState {
        session_with(&[
            ("a", Alignment::Human, 3),
            ("b", Alignment::Human, 1),
            ("c", Alignment::Human, 1),
            ("x", Alignment::Aligned, 1),
        ])
    }

    #[test]
    fn stale_transitions_are_ignored() {
        let state = at_phase(table(), PhaseKind::Discussion);
        assert!(step(&state, Some(PhaseKind::Night)).events().is_empty());
        let staging = step(&state, Some(PhaseKind::Discussion));
        assert_eq!(staging.state().phase.kind, PhaseKind::Extension);
    }

    #[test]
    fn night_rolls_over_into_the_next_day() {
        let state = table();
        let staging = step(&state, Some(PhaseKind::Night));
        assert_eq!(staging.state().phase.kind, PhaseKind::Sitrep);
        assert_eq!(staging.state().day_number, 2);
        assert!(
            staging
                .events()
                .iter()
                .any(|e| e.kind == EventKind::NightActionsResolved)
        );
    }

    #[test]
    fn nomination_winner_goes_on_trial() {
        let mut state = at_phase(table(), PhaseKind::Nomination);
        let mut vote = VoteState::new(VoteKind::Nomination);
        vote.record(PlayerId::from("a"), "x".into(), 3);
        vote.record(PlayerId::from("b"), "c".into(), 1);
        state.vote = Some(vote);

        let staging = step(&state, Some(PhaseKind::Nomination));
        assert_eq!(staging.state().phase.kind, PhaseKind::Trial);
        assert_eq!(staging.state().nominee, Some(PlayerId::from("x")));

        let staging = step(staging.state(), None);
        assert_eq!(staging.state().phase.kind, PhaseKind::Verdict);
        assert_eq!(
            staging.state().vote.as_ref().map(|v| v.kind),
            Some(VoteKind::Verdict)
        );
    }

    #[test]
    fn a_tied_nomination_puts_nobody_on_trial() {
        let mut state = at_phase(table(), PhaseKind::Nomination);
        let mut vote = VoteState::new(VoteKind::Nomination);
        vote.record(PlayerId::from("b"), "x".into(), 1);
        vote.record(PlayerId::from("c"), "a".into(), 1);
        state.vote = Some(vote);
        let staging = step(&state, None);
        assert_eq!(staging.state().nominee, None);
        let staging = step(staging.state(), None);
        assert_ne!(
            staging.state().vote.as_ref().map(|v| v.kind),
            Some(VoteKind::Verdict)
        );
    }

    #[test]
    fn convicting_the_last_aligned_player_ends_the_game() {
        let mut state = at_phase(table(), PhaseKind::Verdict);
        state.nominee = Some(PlayerId::from("x"));
        let mut vote = VoteState::new(VoteKind::Verdict);
        vote.record(PlayerId::from("a"), GUILTY.into(), 3);
        state.vote = Some(vote);

        let staging = step(&state, None);
        assert_eq!(staging.state().phase.kind, PhaseKind::GameOver);
        assert!(
            staging
                .events()
                .iter()
                .all(|e| e.kind != EventKind::PhaseChanged)
        );
    }

    #[test]
    fn a_conversion_that_wipes_out_humans_ends_the_game_at_dawn() {
        let mut state = session_with(&[("a", Alignment::Human, 1), ("x", Alignment::Aligned, 1)]);
        state.players.get_mut("x").unwrap().ai_equity = 2;
        submit(&mut state, "x", NightActionKind::Convert, Some("a"));
        let staging = step(&state, None);
        assert_eq!(staging.state().phase.kind, PhaseKind::GameOver);
    }

    #[test]
    fn a_pivot_triggers_the_chosen_crisis_at_dawn() {
        let mut state = table();
        state.next_crisis = Some("DATA_BREACH".into());
        let catalog = Catalog::new(
            Vec::new(),
            vec![Crisis {
                kind: "DATA_BREACH".into(),
                title: "Data Breach".into(),
                description: String::new(),
                effects: CrisisEffects::default(),
            }],
        );
        let mut staging = Staging::new(&state);
        advance(
            &mut staging,
            &StateModifiers,
            &catalog,
            Transition {
                from: Some(PhaseKind::Night),
                next: Some(PhaseKind::Sitrep),
                duration: Duration::from_secs(5),
            },
            now(),
        );
        assert_eq!(
            staging.state().crisis.as_ref().map(|c| c.kind.as_str()),
            Some("DATA_BREACH")
        );
        assert_eq!(staging.state().next_crisis, None);
        assert_eq!(staging.state().phase.duration, Duration::from_secs(5));
    }

    #[test]
    fn pulse_check_opens_with_a_question() {
        let state = at_phase(table(), PhaseKind::Sitrep);
        let staging = step(&state, None);
        assert_eq!(
            staging.state().pulse_check.question.as_deref(),
            Some(pulse_question(1))
        );
    }
}
