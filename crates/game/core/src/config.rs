use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::state::PhaseKind;

/// Per-session tunables. Stored in [`crate::SessionState`] so that replay
/// reproduces the same defaults the live session used.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub min_players: usize,
    pub max_players: usize,
    /// Tokens granted on join (before mandate adjustments).
    pub starting_tokens: u32,
    pub voting_threshold: f64,
    /// Milestones needed to unlock a role ability when no mandate overrides it.
    pub milestones_for_abilities: u32,
    /// Seed for role assignment. Derived from the session id when absent.
    pub seed: Option<u64>,
    pub phase_durations: PhaseDurations,
}

impl SessionSettings {
    // ===== runtime-tunable defaults =====
    pub const DEFAULT_MIN_PLAYERS: usize = 2;
    pub const DEFAULT_MAX_PLAYERS: usize = 10;
    pub const DEFAULT_STARTING_TOKENS: u32 = 1;
    pub const DEFAULT_VOTING_THRESHOLD: f64 = 0.5;
    pub const DEFAULT_MILESTONES_FOR_ABILITIES: u32 = 3;

    pub fn new() -> Self {
        Self {
            min_players: Self::DEFAULT_MIN_PLAYERS,
            max_players: Self::DEFAULT_MAX_PLAYERS,
            starting_tokens: Self::DEFAULT_STARTING_TOKENS,
            voting_threshold: Self::DEFAULT_VOTING_THRESHOLD,
            milestones_for_abilities: Self::DEFAULT_MILESTONES_FOR_ABILITIES,
            seed: None,
            phase_durations: PhaseDurations::default(),
        }
    }

    pub fn with_phase_durations(mut self, durations: PhaseDurations) -> Self {
        self.phase_durations = durations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_min_players(mut self, min_players: usize) -> Self {
        self.min_players = min_players;
        self
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.min_players == 0 {
            return Err(SettingsError::MinPlayersZero);
        }
        if self.max_players < self.min_players {
            return Err(SettingsError::PlayerBounds {
                min: self.min_players,
                max: self.max_players,
            });
        }
        if !(self.voting_threshold > 0.0 && self.voting_threshold <= 1.0) {
            return Err(SettingsError::VotingThreshold(self.voting_threshold));
        }
        Ok(())
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::new()
    }
}

/// How long each timed phase lasts. Serialized as fractional seconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseDurations {
    #[serde(with = "duration_secs")]
    pub sitrep: Duration,
    #[serde(with = "duration_secs")]
    pub pulse_check: Duration,
    #[serde(with = "duration_secs")]
    pub discussion: Duration,
    #[serde(with = "duration_secs")]
    pub extension: Duration,
    #[serde(with = "duration_secs")]
    pub nomination: Duration,
    #[serde(with = "duration_secs")]
    pub trial: Duration,
    #[serde(with = "duration_secs")]
    pub verdict: Duration,
    #[serde(with = "duration_secs")]
    pub night: Duration,
}

impl PhaseDurations {
    /// Every timed phase set to the same length. Handy for tests.
    pub fn uniform(duration: Duration) -> Self {
        Self {
            sitrep: duration,
            pulse_check: duration,
            discussion: duration,
            extension: duration,
            nomination: duration,
            trial: duration,
            verdict: duration,
            night: duration,
        }
    }

    /// Duration of `phase`, or `None` for phases that never time out.
    pub fn of(&self, phase: PhaseKind) -> Option<Duration> {
        match phase {
            PhaseKind::Sitrep => Some(self.sitrep),
            PhaseKind::PulseCheck => Some(self.pulse_check),
            PhaseKind::Discussion => Some(self.discussion),
            PhaseKind::Extension => Some(self.extension),
            PhaseKind::Nomination => Some(self.nomination),
            PhaseKind::Trial => Some(self.trial),
            PhaseKind::Verdict => Some(self.verdict),
            PhaseKind::Night => Some(self.night),
            PhaseKind::Lobby | PhaseKind::GameOver => None,
        }
    }
}

impl Default for PhaseDurations {
    fn default() -> Self {
        Self {
            sitrep: Duration::from_secs(15),
            pulse_check: Duration::from_secs(30),
            discussion: Duration::from_secs(120),
            extension: Duration::from_secs(15),
            nomination: Duration::from_secs(30),
            trial: Duration::from_secs(30),
            verdict: Duration::from_secs(30),
            night: Duration::from_secs(30),
        }
    }
}

/// Serde adapter for `Duration` as fractional seconds.
pub mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Ok(from_secs_lossy(secs))
    }

    /// Negative, NaN, or overflowing inputs collapse to zero.
    pub fn from_secs_lossy(secs: f64) -> Duration {
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_standard_day_cycle() {
        let durations = PhaseDurations::default();
        assert_eq!(durations.of(PhaseKind::Discussion), Some(Duration::from_secs(120)));
        assert_eq!(durations.of(PhaseKind::Night), Some(Duration::from_secs(30)));
        assert_eq!(durations.of(PhaseKind::Lobby), None);
        assert_eq!(durations.of(PhaseKind::GameOver), None);
    }

    #[test]
    fn validate_rejects_inverted_player_bounds() {
        let mut settings = SessionSettings::default();
        settings.max_players = 1;
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::PlayerBounds { min: 2, max: 1 })
        ));
    }

    #[test]
    fn durations_round_trip_as_fractional_seconds() {
        let durations = PhaseDurations::uniform(Duration::from_millis(250));
        let json = serde_json::to_value(&durations).unwrap();
        assert_eq!(json["night"], serde_json::json!(0.25));
    }

    #[test]
    fn lossy_seconds_clamp_garbage_to_zero() {
        assert_eq!(duration_secs::from_secs_lossy(-3.0), Duration::ZERO);
        assert_eq!(duration_secs::from_secs_lossy(f64::NAN), Duration::ZERO);
    }
}
