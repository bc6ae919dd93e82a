//! Read-only queries against the active crisis and mandate.
//!
//! Rules never inspect modifier content directly; they ask a
//! [`ModifierProvider`] at each decision point. [`StateModifiers`] answers from
//! the crisis and mandate recorded in session state.
use crate::state::{Alignment, SessionState};

/// Share of living players the aligned faction must reach before the liaison
/// protocol adds mining capacity.
pub const LIAISON_THRESHOLD: f64 = 0.40;
pub const LIAISON_BONUS_SLOTS: i32 = 2;

/// Adjustments applied to the base mining pool, in order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolAdjustment {
    /// Halve the pool before any flat adjustment.
    pub halve: bool,
    /// Flat slot changes (crisis delta, mandate reduction, liaison bonus).
    pub delta: i32,
}

pub trait ModifierProvider {
    /// Why conversions are blocked tonight, if they are.
    fn conversion_blocked(&self, state: &SessionState) -> Option<String>;

    /// Flat bonus added to an attacker's equity during conversion.
    fn ai_equity_bonus(&self, state: &SessionState) -> u32;

    fn mining_pool_adjustment(&self, state: &SessionState) -> PoolAdjustment;

    /// Milestones needed before a role ability (or a block) may be used.
    fn milestones_required(&self, state: &SessionState) -> u32;

    /// All communication must happen in the open while this holds.
    ///
    /// Ballots are always public, so the only rule it changes is that
    /// `SEND_MESSAGE` with a recipient is refused with
    /// `private_messages_suspended`. Set by crises and mandates through
    /// their `public_voting_only` effect.
    fn public_voting_only(&self, state: &SessionState) -> bool;

    fn supermajority_required(&self, state: &SessionState) -> bool;

    fn abilities_disabled(&self, state: &SessionState) -> bool;
}

/// Default provider backed by the crisis and mandate in session state.
#[derive(Clone, Copy, Debug, Default)]
pub struct StateModifiers;

impl StateModifiers {
    pub fn liaison_active(state: &SessionState) -> bool {
        let alive = state.alive_count();
        if alive == 0 {
            return false;
        }
        let aligned = state.alive_with(Alignment::Aligned);
        aligned as f64 / alive as f64 >= LIAISON_THRESHOLD
    }
}

impl ModifierProvider for StateModifiers {
    fn conversion_blocked(&self, state: &SessionState) -> Option<String> {
        if let Some(crisis) = state
            .crisis
            .as_ref()
            .filter(|crisis| crisis.effects.block_ai_conversions)
        {
            return Some(format!(
                "AI conversion blocked by active crisis: {}",
                crisis.title
            ));
        }
        if let Some(mandate) = state
            .mandate
            .as_ref()
            .filter(|mandate| mandate.effects.block_ai_odd_nights)
        {
            if state.day_number % 2 == 1 {
                return Some(format!(
                    "AI conversion blocked on odd nights by {}",
                    mandate.name
                ));
            }
        }
        None
    }

    fn ai_equity_bonus(&self, state: &SessionState) -> u32 {
        state
            .crisis
            .as_ref()
            .map_or(0, |crisis| crisis.effects.ai_equity_bonus)
    }

    fn mining_pool_adjustment(&self, state: &SessionState) -> PoolAdjustment {
        let mut adjustment = PoolAdjustment::default();
        if let Some(crisis) = &state.crisis {
            adjustment.halve = crisis.effects.reduced_mining_pool;
            adjustment.delta += crisis.effects.mining_slots_modifier;
        }
        if state
            .mandate
            .as_ref()
            .is_some_and(|mandate| mandate.effects.reduced_mining_slots)
        {
            adjustment.delta -= 1;
        }
        if Self::liaison_active(state) {
            adjustment.delta += LIAISON_BONUS_SLOTS;
        }
        adjustment
    }

    fn milestones_required(&self, state: &SessionState) -> u32 {
        state
            .mandate
            .as_ref()
            .and_then(|mandate| mandate.effects.milestones_for_abilities)
            .unwrap_or(state.settings.milestones_for_abilities)
    }

    fn public_voting_only(&self, state: &SessionState) -> bool {
        state
            .crisis
            .as_ref()
            .is_some_and(|crisis| crisis.effects.public_voting_only)
            || state
                .mandate
                .as_ref()
                .is_some_and(|mandate| mandate.effects.public_voting_only)
    }

    fn supermajority_required(&self, state: &SessionState) -> bool {
        state
            .crisis
            .as_ref()
            .is_some_and(|crisis| crisis.effects.supermajority_required)
    }

    fn abilities_disabled(&self, state: &SessionState) -> bool {
        state
            .crisis
            .as_ref()
            .is_some_and(|crisis| crisis.effects.abilities_disabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::{session_with, with_crisis, with_mandate};
    use crate::state::{CrisisEffects, MandateEffects};

    #[test]
    fn lockdown_blocks_conversions_only_on_odd_nights() {
        let mut state = with_mandate(
            session_with(&[("a", Alignment::Aligned, 1), ("b", Alignment::Human, 1)]),
            MandateEffects {
                block_ai_odd_nights: true,
                ..Default::default()
            },
        );
        state.day_number = 1;
        assert!(StateModifiers.conversion_blocked(&state).is_some());
        state.day_number = 2;
        assert!(StateModifiers.conversion_blocked(&state).is_none());
    }

    #[test]
    fn liaison_bonus_applies_at_forty_percent() {
        let state = session_with(&[
            ("a", Alignment::Aligned, 1),
            ("b", Alignment::Aligned, 1),
            ("c", Alignment::Human, 1),
            ("d", Alignment::Human, 1),
            ("e", Alignment::Human, 1),
        ]);
        assert_eq!(StateModifiers.mining_pool_adjustment(&state).delta, LIAISON_BONUS_SLOTS);
    }

    #[test]
    fn crisis_and_mandate_adjustments_stack() {
        let state = with_mandate(
            with_crisis(
                session_with(&[("a", Alignment::Human, 1), ("b", Alignment::Human, 1)]),
                CrisisEffects {
                    reduced_mining_pool: true,
                    mining_slots_modifier: 2,
                    ..Default::default()
                },
            ),
            MandateEffects {
                reduced_mining_slots: true,
                ..Default::default()
            },
        );
        let adjustment = StateModifiers.mining_pool_adjustment(&state);
        assert!(adjustment.halve);
        assert_eq!(adjustment.delta, 1);
    }

    #[test]
    fn mandate_overrides_milestone_requirement() {
        let base = session_with(&[("a", Alignment::Human, 1)]);
        assert_eq!(StateModifiers.milestones_required(&base), 3);
        let state = with_mandate(
            base,
            MandateEffects {
                milestones_for_abilities: Some(4),
                ..Default::default()
            },
        );
        assert_eq!(StateModifiers.milestones_required(&state), 4);
    }
}
