//! Typed views over event payloads.
//!
//! Every struct is `#[serde(default)]` so that a missing field reads as its
//! zero value. Construction sites serialize these into [`super::Payload`];
//! the reducer projects them back with [`super::Event::payload_as`].
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::duration_secs;
use crate::state::{
    Alignment, Crisis, Faction, KpiKind, Mandate, NightActionKind, PhaseKind, PlayerId, RoleKind,
    VoteKind,
};

use super::Payload;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerJoined {
    pub name: String,
    pub job_title: String,
    pub tokens: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleAssigned {
    pub role_type: Option<RoleKind>,
    pub role_name: String,
    pub role_description: String,
    pub alignment: Alignment,
    pub kpi_type: Option<KpiKind>,
    pub kpi_description: String,
    /// Starting conversion strength; zero for humans.
    pub ai_equity: u32,
}

/// Payload of both `GAME_STARTED` and `PHASE_CHANGED`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseChanged {
    pub phase_type: Option<PhaseKind>,
    pub previous_phase: Option<PhaseKind>,
    #[serde(with = "duration_secs")]
    pub duration: std::time::Duration,
    pub day_number: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoteStarted {
    pub vote_type: Option<VoteKind>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoteCast {
    pub vote_type: Option<VoteKind>,
    pub target_id: String,
    /// Voter's token balance when the vote was cast.
    pub weight: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoteCompleted {
    pub vote_type: Option<VoteKind>,
    /// Empty when nobody won.
    pub winner: String,
    pub weight: u32,
    pub tied: bool,
    pub tally: BTreeMap<String, u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerNominated {
    pub votes: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerEliminated {
    pub role_type: Option<RoleKind>,
    pub alignment: Alignment,
    pub guilty: u32,
    pub innocent: u32,
}

/// Payload of `TOKENS_AWARDED` and `TOKENS_LOST`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokensChanged {
    pub amount: u32,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningSuccessful {
    pub miner_id: PlayerId,
    pub target_id: PlayerId,
    pub amount: u32,
}

impl Default for MiningSuccessful {
    fn default() -> Self {
        Self {
            miner_id: PlayerId::default(),
            target_id: PlayerId::default(),
            amount: 1,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiEquityChanged {
    pub amount: u32,
    pub source_id: PlayerId,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NightActionSubmitted {
    pub action_type: Option<NightActionKind>,
    pub target_id: Option<PlayerId>,
    pub details: Payload,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NightActionsResolved {
    pub night_number: u32,
    pub total_actions: usize,
    pub blocked_players: Vec<PlayerId>,
    pub converted_players: Vec<PlayerId>,
    /// Winning miner → mined-for player.
    pub mining_results: BTreeMap<PlayerId, PlayerId>,
    pub failed_miners: Vec<PlayerId>,
    pub next_phase: Option<PhaseKind>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerBlocked {
    pub blocker_id: PlayerId,
    pub source: Option<NightActionKind>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerProtected {
    pub protector_id: PlayerId,
    pub target_id: PlayerId,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerInvestigated {
    pub investigator_id: PlayerId,
    pub target_id: PlayerId,
    pub target_name: String,
    pub alignment: Alignment,
    pub role: Option<RoleKind>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conversion {
    pub converter_id: PlayerId,
    pub target_id: PlayerId,
    /// Equity the converted player starts their own attacks with.
    pub equity_gained: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerShocked {
    pub converter_id: PlayerId,
    pub shock_type: String,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectMilestone {
    /// Milestone count after this grant.
    pub milestones: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleAbilityUnlocked {
    pub role_type: Option<RoleKind>,
    pub ability: Option<NightActionKind>,
}

/// Shared payload of the role-ability events.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilityUsed {
    pub actor_id: PlayerId,
    pub target_id: Option<PlayerId>,
    pub source_id: Option<PlayerId>,
    pub chosen_crisis: Option<String>,
    pub redacted_section: Option<String>,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatMessage {
    pub message_id: String,
    pub player_name: String,
    pub message: String,
    /// Recipient of a direct message; `None` for the shared channel.
    pub target_id: Option<PlayerId>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemMessage {
    pub message: String,
    /// Machine-readable reason, set on rejection notices.
    pub code: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackStatusChanged {
    pub status: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrisisTriggered {
    pub crisis: Crisis,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MandateActivated {
    pub mandate: Mandate,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseCheckStarted {
    pub question: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseCheckSubmitted {
    pub response: String,
}

/// Payload of `KPI_PROGRESS` and `KPI_COMPLETED`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KpiUpdate {
    pub kpi_type: Option<KpiKind>,
    pub progress: u32,
    pub target: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VictoryCondition {
    pub winner: Option<Faction>,
    pub condition: String,
    pub description: String,
}
