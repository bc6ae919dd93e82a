//! Authoritative session state representation.
//!
//! This module owns the data structures describing players, the phase clock,
//! votes, modifiers, and the per-night transient sets. Runtime layers clone or
//! query this state but change it exclusively by folding events through
//! [`crate::reducer`].
mod ids;
mod modifiers;
mod night;
mod phase;
mod player;
mod vote;

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

pub use ids::{PlayerId, SessionId};
pub use modifiers::{Catalog, Crisis, CrisisEffects, Mandate, MandateEffects};
pub use night::{NightActionKind, SubmittedNightAction};
pub use phase::{Phase, PhaseKind};
pub use player::{Alignment, Kpi, KpiKind, Player, Role, RoleKind};
pub use vote::{GUILTY, INNOCENT, VoteKind, VoteState};

use crate::config::SessionSettings;

/// Canonical snapshot of one session.
///
/// Maps are ordered so that every pass over players or night actions visits
/// them in id order, which keeps resolution reproducible.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub id: SessionId,
    pub settings: SessionSettings,
    pub created_at: DateTime<Utc>,
    pub phase: Phase,
    pub day_number: u32,
    pub players: BTreeMap<PlayerId, Player>,
    pub vote: Option<VoteState>,
    /// Winner of the last nomination vote, on trial until the verdict resolves.
    pub nominee: Option<PlayerId>,
    pub crisis: Option<Crisis>,
    pub mandate: Option<Mandate>,
    pub night_actions: BTreeMap<PlayerId, SubmittedNightAction>,
    pub blocked_tonight: BTreeSet<PlayerId>,
    pub protected_tonight: BTreeSet<PlayerId>,
    /// Crisis queued by a pivot, triggered when the next day opens.
    pub next_crisis: Option<String>,
    /// Report section redacted by a hotfix for the next day.
    pub sitrep_redaction: Option<String>,
    pub pulse_check: PulseCheck,
    pub chat: Vec<ChatMessage>,
    pub win_condition: Option<WinCondition>,
    /// Sequence number of the last event folded into this state.
    pub last_seq: u64,
}

impl SessionState {
    pub fn new(id: SessionId, settings: SessionSettings, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            settings,
            created_at,
            phase: Phase::lobby(created_at),
            day_number: 0,
            players: BTreeMap::new(),
            vote: None,
            nominee: None,
            crisis: None,
            mandate: None,
            night_actions: BTreeMap::new(),
            blocked_tonight: BTreeSet::new(),
            protected_tonight: BTreeSet::new(),
            next_crisis: None,
            sitrep_redaction: None,
            pulse_check: PulseCheck::default(),
            chat: Vec::new(),
            win_condition: None,
            last_seq: 0,
        }
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn alive_player(&self, id: &str) -> Option<&Player> {
        self.players.get(id).filter(|player| player.alive)
    }

    pub fn alive_players(&self) -> impl Iterator<Item = &Player> {
        self.players.values().filter(|player| player.alive)
    }

    pub fn alive_count(&self) -> usize {
        self.alive_players().count()
    }

    pub fn alive_with(&self, alignment: Alignment) -> usize {
        self.alive_players()
            .filter(|player| player.alignment == alignment)
            .count()
    }

    /// Living players of the given alignment, in id order.
    pub fn alive_ids_with(&self, alignment: Alignment) -> Vec<PlayerId> {
        self.alive_players()
            .filter(|player| player.alignment == alignment)
            .map(|player| player.id.clone())
            .collect()
    }

    pub fn is_over(&self) -> bool {
        self.phase.kind == PhaseKind::GameOver
    }

    pub fn is_blocked(&self, id: &str) -> bool {
        self.blocked_tonight.contains(id)
    }

    pub fn is_protected(&self, id: &str) -> bool {
        self.protected_tonight.contains(id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub player_id: Option<PlayerId>,
    pub player_name: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub is_system: bool,
}

/// The daily pulse-check question and its answers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulseCheck {
    pub question: Option<String>,
    pub responses: BTreeMap<PlayerId, String>,
}

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
pub enum Faction {
    Humans,
    Ai,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinCondition {
    pub winner: Faction,
    pub condition: String,
    pub description: String,
}
