use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Phases of a session.
///
/// The timed cycle is `Sitrep → PulseCheck → Discussion → Extension →
/// Nomination → Trial → Verdict → Night → Sitrep`. `Lobby` precedes the first
/// cycle and `GameOver` is absorbing; neither has a timer.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseKind {
    #[default]
    Lobby,
    Sitrep,
    PulseCheck,
    Discussion,
    Extension,
    Nomination,
    Trial,
    Verdict,
    Night,
    GameOver,
}

impl PhaseKind {
    /// Next phase in the daily cycle. `Lobby` and `GameOver` have none: the
    /// lobby ends by initialization and the game ends by a victory event.
    pub const fn next(self) -> Option<PhaseKind> {
        match self {
            Self::Sitrep => Some(Self::PulseCheck),
            Self::PulseCheck => Some(Self::Discussion),
            Self::Discussion => Some(Self::Extension),
            Self::Extension => Some(Self::Nomination),
            Self::Nomination => Some(Self::Trial),
            Self::Trial => Some(Self::Verdict),
            Self::Verdict => Some(Self::Night),
            Self::Night => Some(Self::Sitrep),
            Self::Lobby | Self::GameOver => None,
        }
    }

    pub const fn is_timed(self) -> bool {
        self.next().is_some()
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// The phase the session is currently in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub kind: PhaseKind,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
}

impl Phase {
    pub fn new(kind: PhaseKind, started_at: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            kind,
            started_at,
            duration,
        }
    }

    pub fn lobby(created_at: DateTime<Utc>) -> Self {
        Self::new(PhaseKind::Lobby, created_at, Duration::ZERO)
    }

    /// Wall-clock instant after which the phase is overdue.
    pub fn ends_at(&self) -> DateTime<Utc> {
        let duration = chrono::Duration::from_std(self.duration)
            .unwrap_or_else(|_| chrono::Duration::days(36_500));
        self.started_at
            .checked_add_signed(duration)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_returns_to_sitrep_after_eight_steps() {
        let mut phase = PhaseKind::Sitrep;
        for _ in 0..8 {
            phase = phase.next().unwrap();
        }
        assert_eq!(phase, PhaseKind::Sitrep);
    }

    #[test]
    fn terminal_phases_have_no_successor() {
        assert_eq!(PhaseKind::GameOver.next(), None);
        assert_eq!(PhaseKind::Lobby.next(), None);
        assert!(!PhaseKind::GameOver.is_timed());
    }

    #[test]
    fn wire_names_are_screaming_snake_case() {
        assert_eq!(PhaseKind::PulseCheck.as_str(), "PULSE_CHECK");
        assert_eq!("GAME_OVER".parse::<PhaseKind>().unwrap(), PhaseKind::GameOver);
    }
}
