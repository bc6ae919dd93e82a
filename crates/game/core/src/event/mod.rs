//! Immutable facts emitted by the session and folded by the reducer.
//!
//! Payloads are open JSON maps at the boundary. Every consumer projects the map
//! into one of the typed structs in [`payloads`] before reading it; a payload
//! that does not fit its struct degrades to that struct's default.
pub mod payloads;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString, IntoStaticStr};

use crate::state::{PlayerId, SessionId};

/// Open key-value payload carried by events and actions.
pub type Payload = serde_json::Map<String, Value>;

/// Event types.
///
/// Unrecognized names deserialize to [`EventKind::Unknown`], which the reducer
/// ignores, so old binaries can replay logs written by newer ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr)]
#[serde(from = "String", into = "&'static str")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    // Lifecycle
    GameStarted,
    PhaseChanged,
    VictoryCondition,

    // Players
    PlayerJoined,
    PlayerLeft,
    PlayerEliminated,
    PlayerShocked,
    RoleAssigned,
    RoleAbilityUnlocked,
    ProjectMilestone,
    SlackStatusChanged,

    // Voting
    VoteStarted,
    VoteCast,
    VoteCompleted,
    PlayerNominated,

    // Economy
    TokensAwarded,
    TokensLost,
    MiningSuccessful,
    AiEquityChanged,

    // Night
    NightActionSubmitted,
    NightActionsResolved,
    PlayerBlocked,
    PlayerProtected,
    PlayerInvestigated,
    AiConversionSuccess,

    // Role abilities
    RunAudit,
    OverclockServers,
    IsolateNode,
    PerformanceReview,
    ReallocateBudget,
    Pivot,
    DeployHotfix,

    // Communication
    ChatMessage,
    SystemMessage,
    PrivateNotification,

    // Modifiers and objectives
    CrisisTriggered,
    MandateActivated,
    PulseCheckStarted,
    PulseCheckSubmitted,
    KpiProgress,
    KpiCompleted,

    Unknown,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

impl From<String> for EventKind {
    fn from(raw: String) -> Self {
        raw.parse().unwrap_or(EventKind::Unknown)
    }
}

/// Who receives an event. Private events go to `player_id` only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Stable id, assigned by the session when the event is committed.
    #[serde(default)]
    pub id: String,
    /// Position in the session's log, assigned on commit.
    #[serde(default)]
    pub seq: u64,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub session_id: SessionId,
    /// The player this event is about.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<PlayerId>,
    #[serde(default)]
    pub visibility: Visibility,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub payload: Payload,
}

impl Event {
    pub fn new(kind: EventKind, session_id: SessionId, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: String::new(),
            seq: 0,
            kind,
            session_id,
            player_id: None,
            visibility: Visibility::Public,
            timestamp,
            payload: Payload::new(),
        }
    }

    /// Public event about `player`.
    pub fn about(mut self, player: &PlayerId) -> Self {
        self.player_id = Some(player.clone());
        self
    }

    /// Event delivered only to `player`.
    pub fn private_to(mut self, player: &PlayerId) -> Self {
        self.player_id = Some(player.clone());
        self.visibility = Visibility::Private;
        self
    }

    /// Merges the fields of a serializable struct into the payload.
    pub fn with<T: Serialize>(mut self, payload: &T) -> Self {
        if let Ok(Value::Object(fields)) = serde_json::to_value(payload) {
            self.payload.extend(fields);
        }
        self
    }

    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.payload.insert(key.to_owned(), value.into());
        self
    }

    /// Projects the payload into `T`, falling back to `T::default()` when
    /// the payload does not fit.
    pub fn payload_as<T: DeserializeOwned + Default>(&self) -> T {
        project(&self.payload)
    }

    pub fn subject(&self) -> Option<&PlayerId> {
        self.player_id.as_ref().filter(|id| !id.is_empty())
    }

    /// The single recipient of a private event.
    pub fn recipient(&self) -> Option<&PlayerId> {
        match self.visibility {
            Visibility::Private => self.subject(),
            Visibility::Public => None,
        }
    }

    pub fn is_private(&self) -> bool {
        self.recipient().is_some()
    }
}

/// Lenient projection shared by events and actions.
pub fn project<T: DeserializeOwned + Default>(payload: &Payload) -> T {
    serde_json::from_value(Value::Object(payload.clone())).unwrap_or_default()
}
