//! Requested intents. Actions are never persisted; only the events they
//! produce are.
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString, IntoStaticStr};

use crate::config::duration_secs;
use crate::event::{Payload, project};
use crate::state::{NightActionKind, PhaseKind, PlayerId, SessionId};

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
pub enum ActionKind {
    /// Assigns roles and alignments and opens the first day.
    #[serde(alias = "START_GAME")]
    #[strum(to_string = "INITIALIZE_SESSION", serialize = "START_GAME")]
    InitializeSession,
    JoinGame,
    LeaveGame,
    /// Synthesized by the phase scheduler when a timer expires.
    PhaseTransition,
    SubmitVote,
    SubmitNightAction,
    SendMessage,
    SubmitPulseCheck,
    SetSlackStatus,
    TriggerCrisis,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    /// Acting player; `None` for system actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<PlayerId>,
    pub session_id: SessionId,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub payload: Payload,
}

impl Action {
    pub fn new(kind: ActionKind, session_id: SessionId, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind,
            player_id: None,
            session_id,
            timestamp,
            payload: Payload::new(),
        }
    }

    pub fn by(mut self, player: impl Into<PlayerId>) -> Self {
        self.player_id = Some(player.into());
        self
    }

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

    pub fn payload_as<T: DeserializeOwned + Default>(&self) -> T {
        project(&self.payload)
    }

    /// The timer-driven transition out of `from`.
    pub fn phase_transition(
        session_id: SessionId,
        from: PhaseKind,
        next: PhaseKind,
        duration: Duration,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::new(ActionKind::PhaseTransition, session_id, timestamp).with(&PhaseTransition {
            from_phase: Some(from),
            next_phase: Some(next),
            duration,
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitializeSession {
    pub seed: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinGame {
    pub name: String,
    pub job_title: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseTransition {
    /// Phase the timer was armed for. A transition whose source no longer
    /// matches the current phase is stale and ignored.
    pub from_phase: Option<PhaseKind>,
    pub next_phase: Option<PhaseKind>,
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitVote {
    pub target_id: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitNightAction {
    pub action_type: Option<NightActionKind>,
    pub target_id: Option<PlayerId>,
    /// Ability extras such as `source_id`, `chosen_crisis`, `redacted_section`.
    pub details: Payload,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SendMessage {
    pub message: String,
    pub target_id: Option<PlayerId>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitPulseCheck {
    pub response: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetSlackStatus {
    pub status: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerCrisis {
    pub crisis_type: String,
}
