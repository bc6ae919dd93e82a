//! Token-weighted voting.
//!
//! A vote's weight is the voter's token balance at the moment of casting and is
//! stored with the ballot, so later balance changes never move a past vote.
use chrono::{DateTime, Utc};

use crate::error::ActionError;
use crate::event::{Event, EventKind, payloads};
use crate::state::{GUILTY, INNOCENT, PlayerId, SessionState, VoteKind, VoteState};

/// Result of tallying a vote.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VoteOutcome {
    /// `None` when nobody voted or the top weight is shared.
    pub winner: Option<String>,
    pub weight: u32,
    pub tied: bool,
}

pub fn start_vote(state: &SessionState, kind: VoteKind, now: DateTime<Utc>) -> Event {
    Event::new(EventKind::VoteStarted, state.id.clone(), now).with(&payloads::VoteStarted {
        vote_type: Some(kind),
    })
}

/// Validates a ballot and produces its `VOTE_CAST` event.
pub fn cast_vote(
    state: &SessionState,
    voter: &PlayerId,
    target: &str,
    now: DateTime<Utc>,
) -> Result<Event, ActionError> {
    let player = state
        .player(voter.as_str())
        .ok_or_else(|| ActionError::PlayerNotFound(voter.clone()))?;
    if !player.alive {
        return Err(ActionError::ActorDead);
    }
    let vote = state.vote.as_ref().ok_or(ActionError::NoActiveVote)?;
    if state.phase.kind != vote.kind.phase() {
        return Err(ActionError::WrongPhase {
            action: "voting",
            phase: state.phase.kind,
        });
    }
    check_target(state, vote.kind, target)?;

    Ok(Event::new(EventKind::VoteCast, state.id.clone(), now)
        .about(voter)
        .with(&payloads::VoteCast {
            vote_type: Some(vote.kind),
            target_id: target.to_owned(),
            weight: player.tokens,
        }))
}

fn check_target(state: &SessionState, kind: VoteKind, target: &str) -> Result<(), ActionError> {
    let illegal = || ActionError::IllegalVoteTarget {
        kind,
        target: target.to_owned(),
    };
    if target.is_empty() {
        return Err(ActionError::MissingTarget);
    }
    match kind {
        VoteKind::Nomination => {
            state.alive_player(target).ok_or_else(illegal)?;
        }
        VoteKind::Verdict => {
            if target != GUILTY && target != INNOCENT {
                return Err(illegal());
            }
        }
        // Extension ballots are informational; any choice is accepted.
        VoteKind::Extension => {}
    }
    Ok(())
}

/// True once every living player has voted.
pub fn is_complete(state: &SessionState, vote: &VoteState) -> bool {
    vote.voter_count() >= state.alive_count()
}

/// Highest summed weight wins; a shared non-zero maximum is a tie.
pub fn outcome(vote: &VoteState) -> VoteOutcome {
    let max = vote.tally.values().copied().max().unwrap_or(0);
    if max == 0 {
        return VoteOutcome::default();
    }
    let mut leaders = vote.tally.iter().filter(|(_, weight)| **weight == max);
    let first = leaders.next().map(|(target, _)| target.clone());
    if leaders.next().is_some() {
        return VoteOutcome {
            winner: None,
            weight: max,
            tied: true,
        };
    }
    VoteOutcome {
        winner: first,
        weight: max,
        tied: false,
    }
}

pub fn complete_vote(state: &SessionState, vote: &VoteState, now: DateTime<Utc>) -> Event {
    let result = outcome(vote);
    Event::new(EventKind::VoteCompleted, state.id.clone(), now).with(&payloads::VoteCompleted {
        vote_type: Some(vote.kind),
        winner: result.winner.unwrap_or_default(),
        weight: result.weight,
        tied: result.tied,
        tally: vote.tally.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reducer::apply;
    use crate::rules::testing::{at_phase, kill, now, session_with};
    use crate::state::{Alignment, PhaseKind};

    fn nomination_state() -> SessionState {
        let mut state = at_phase(
            session_with(&[
                ("a", Alignment::Human, 3),
                ("b", Alignment::Human, 5),
                ("c", Alignment::Aligned, 2),
            ]),
            PhaseKind::Nomination,
        );
        state.vote = Some(VoteState::new(VoteKind::Nomination));
        state
    }

    fn cast(state: SessionState, voter: &str, target: &str) -> SessionState {
        let event = cast_vote(&state, &PlayerId::from(voter), target, now()).unwrap();
        apply(state, &event)
    }

    #[test]
    fn weighted_nomination_picks_the_heaviest_target() {
        let state = nomination_state();
        let state = cast(state, "a", "c");
        let state = cast(state, "b", "c");
        let state = cast(state, "c", "b");

        let vote = state.vote.as_ref().unwrap();
        assert_eq!(vote.weight_for("b"), 2);
        assert_eq!(vote.weight_for("c"), 8);
        assert!(is_complete(&state, vote));
        assert_eq!(
            outcome(vote),
            VoteOutcome {
                winner: Some("c".into()),
                weight: 8,
                tied: false
            }
        );
    }

    #[test]
    fn cast_weight_is_frozen() {
        let mut state = cast(nomination_state(), "a", "c");
        state.players.get_mut("a").unwrap().tokens = 100;
        let vote = state.vote.as_ref().unwrap();
        assert_eq!(vote.weight_for("c"), 3);
    }

    #[test]
    fn equal_maxima_are_a_tie() {
        let mut vote = VoteState::new(VoteKind::Nomination);
        vote.record(PlayerId::from("a"), "x".into(), 4);
        vote.record(PlayerId::from("b"), "y".into(), 4);
        let result = outcome(&vote);
        assert_eq!(result.winner, None);
        assert!(result.tied);
    }

    #[test]
    fn empty_or_weightless_votes_have_no_winner() {
        let mut vote = VoteState::new(VoteKind::Nomination);
        assert_eq!(outcome(&vote), VoteOutcome::default());
        vote.record(PlayerId::from("a"), "x".into(), 0);
        assert_eq!(outcome(&vote).winner, None);
        assert!(!outcome(&vote).tied);
    }

    #[test]
    fn dead_voters_and_dead_nominees_are_rejected() {
        let mut state = nomination_state();
        kill(&mut state, "c");
        assert_eq!(
            cast_vote(&state, &PlayerId::from("c"), "a", now()),
            Err(ActionError::ActorDead)
        );
        assert!(matches!(
            cast_vote(&state, &PlayerId::from("a"), "c", now()),
            Err(ActionError::IllegalVoteTarget { .. })
        ));
    }

    #[test]
    fn extension_accepts_dead_targets() {
        let mut state = at_phase(nomination_state(), PhaseKind::Extension);
        state.vote = Some(VoteState::new(VoteKind::Extension));
        kill(&mut state, "c");
        assert!(cast_vote(&state, &PlayerId::from("a"), "c", now()).is_ok());
    }

    #[test]
    fn votes_outside_their_phase_are_rejected() {
        let state = at_phase(nomination_state(), PhaseKind::Discussion);
        assert!(matches!(
            cast_vote(&state, &PlayerId::from("a"), "b", now()),
            Err(ActionError::WrongPhase { .. })
        ));
        let mut state = state;
        state.vote = None;
        assert_eq!(
            cast_vote(&state, &PlayerId::from("a"), "b", now()),
            Err(ActionError::NoActiveVote)
        );
    }

    #[test]
    fn verdict_accepts_ballot_choices() {
        let mut state = at_phase(nomination_state(), PhaseKind::Verdict);
        state.vote = Some(VoteState::new(VoteKind::Verdict));
        assert!(cast_vote(&state, &PlayerId::from("a"), GUILTY, now()).is_ok());
        assert!(cast_vote(&state, &PlayerId::from("a"), INNOCENT, now()).is_ok());
        assert!(cast_vote(&state, &PlayerId::from("a"), "MAYBE", now()).is_err());
    }

    #[test]
    fn verdict_rejects_player_ids() {
        let mut state = at_phase(nomination_state(), PhaseKind::Verdict);
        state.vote = Some(VoteState::new(VoteKind::Verdict));
        assert_eq!(
            cast_vote(&state, &PlayerId::from("a"), "b", now()).unwrap_err(),
            ActionError::IllegalVoteTarget {
                kind: VoteKind::Verdict,
                target: "b".into(),
            }
        );
    }
}
