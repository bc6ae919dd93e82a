use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use super::{PhaseKind, PlayerId};

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum VoteKind {
    Nomination,
    Verdict,
    Extension,
}

impl VoteKind {
    /// The only phase in which votes of this kind may be cast.
    pub const fn phase(self) -> PhaseKind {
        match self {
            Self::Nomination => PhaseKind::Nomination,
            Self::Verdict => PhaseKind::Verdict,
            Self::Extension => PhaseKind::Extension,
        }
    }

    pub const fn for_phase(phase: PhaseKind) -> Option<VoteKind> {
        match phase {
            PhaseKind::Nomination => Some(Self::Nomination),
            PhaseKind::Verdict => Some(Self::Verdict),
            PhaseKind::Extension => Some(Self::Extension),
            _ => None,
        }
    }
}

/// Ballot choices for a verdict vote.
pub const GUILTY: &str = "GUILTY";
pub const INNOCENT: &str = "INNOCENT";

/// An open vote.
///
/// `tally` is derived: it is recomputed from `votes` and `weights` after every
/// cast and never adjusted incrementally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteState {
    pub kind: VoteKind,
    /// Voter → chosen target (a player id or a ballot choice).
    pub votes: BTreeMap<PlayerId, String>,
    /// Voter → token balance captured when the vote was cast.
    pub weights: BTreeMap<PlayerId, u32>,
    /// Target → summed weight.
    pub tally: BTreeMap<String, u32>,
    pub complete: bool,
}

impl VoteState {
    pub fn new(kind: VoteKind) -> Self {
        Self {
            kind,
            votes: BTreeMap::new(),
            weights: BTreeMap::new(),
            tally: BTreeMap::new(),
            complete: false,
        }
    }

    /// Records (or replaces) a voter's choice with the given weight snapshot.
    pub fn record(&mut self, voter: PlayerId, target: String, weight: u32) {
        self.votes.insert(voter.clone(), target);
        self.weights.insert(voter, weight);
        self.recompute();
    }

    pub fn recompute(&mut self) {
        let mut tally = BTreeMap::new();
        for (voter, target) in &self.votes {
            let weight = self.weights.get(voter).copied().unwrap_or(0);
            *tally.entry(target.clone()).or_insert(0) += weight;
        }
        self.tally = tally;
    }

    pub fn weight_for(&self, target: &str) -> u32 {
        self.tally.get(target).copied().unwrap_or(0)
    }

    pub fn voter_count(&self) -> usize {
        self.votes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recast_replaces_previous_choice() {
        let mut vote = VoteState::new(VoteKind::Nomination);
        vote.record(PlayerId::from("a"), "b".into(), 3);
        vote.record(PlayerId::from("a"), "c".into(), 3);

        assert_eq!(vote.weight_for("b"), 0);
        assert_eq!(vote.weight_for("c"), 3);
        assert!(!vote.tally.contains_key("b"));
        assert_eq!(vote.voter_count(), 1);
    }
}
