use serde::{Deserialize, Serialize};

use crate::event::Payload;

/// A daily crisis altering the rules until replaced.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Crisis {
    pub kind: String,
    pub title: String,
    pub description: String,
    pub effects: CrisisEffects,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrisisEffects {
    /// Verdicts need two thirds of the cast weight.
    pub supermajority_required: bool,
    /// Private messages are suspended.
    pub public_voting_only: bool,
    pub ai_equity_bonus: u32,
    pub block_ai_conversions: bool,
    /// Halves the mining pool.
    pub reduced_mining_pool: bool,
    /// Flat adjustment to the mining pool after halving.
    pub mining_slots_modifier: i32,
    pub abilities_disabled: bool,
    /// Effects this build does not interpret; preserved for replay.
    #[serde(flatten)]
    pub extra: Payload,
}

/// A game-wide rule modifier chosen at session start.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Mandate {
    pub kind: String,
    pub name: String,
    pub description: String,
    pub effects: MandateEffects,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MandateEffects {
    /// Extra tokens granted to every player when the mandate activates.
    pub starting_tokens_bonus: u32,
    /// Removes one mining slot.
    pub reduced_mining_slots: bool,
    pub public_voting_only: bool,
    /// Overrides the milestone requirement for abilities.
    pub milestones_for_abilities: Option<u32>,
    /// Conversions fail on odd-numbered nights.
    pub block_ai_odd_nights: bool,
    #[serde(flatten)]
    pub extra: Payload,
}

/// Mandates and crises available to a session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub mandates: Vec<Mandate>,
    pub crises: Vec<Crisis>,
}

impl Catalog {
    pub fn new(mandates: Vec<Mandate>, crises: Vec<Crisis>) -> Self {
        Self { mandates, crises }
    }

    pub fn crisis(&self, kind: &str) -> Option<&Crisis> {
        self.crises
            .iter()
            .find(|crisis| crisis.kind.eq_ignore_ascii_case(kind))
    }

    pub fn mandate(&self, kind: &str) -> Option<&Mandate> {
        self.mandates
            .iter()
            .find(|mandate| mandate.kind.eq_ignore_ascii_case(kind))
    }

    /// Deterministic mandate pick for a seed.
    pub fn mandate_for_seed(&self, seed: u64) -> Option<&Mandate> {
        if self.mandates.is_empty() {
            return None;
        }
        let index = (seed % self.mandates.len() as u64) as usize;
        self.mandates.get(index)
    }
}
