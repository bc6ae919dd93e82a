use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use super::PlayerId;
use crate::event::Payload;

/// Intents a player can queue during the night.
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
pub enum NightActionKind {
    #[serde(alias = "MINE_TOKENS")]
    #[strum(to_string = "MINE", serialize = "MINE_TOKENS")]
    Mine,
    Block,
    Investigate,
    Protect,
    #[serde(alias = "ATTEMPT_CONVERSION")]
    #[strum(to_string = "CONVERT", serialize = "ATTEMPT_CONVERSION")]
    Convert,
    ProjectMilestones,
    RunAudit,
    OverclockServers,
    IsolateNode,
    PerformanceReview,
    ReallocateBudget,
    Pivot,
    DeployHotfix,
}

impl NightActionKind {
    /// Role-specific abilities, resolved in the third pass.
    pub const fn is_role_ability(self) -> bool {
        matches!(
            self,
            Self::RunAudit
                | Self::OverclockServers
                | Self::IsolateNode
                | Self::PerformanceReview
                | Self::ReallocateBudget
                | Self::Pivot
                | Self::DeployHotfix
        )
    }

    /// Whether submission must name another player.
    pub const fn requires_target(self) -> bool {
        !matches!(
            self,
            Self::ProjectMilestones | Self::Pivot | Self::DeployHotfix
        )
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// A pending night intent, keyed by the submitting player in session state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubmittedNightAction {
    pub player_id: PlayerId,
    pub kind: NightActionKind,
    pub target_id: Option<PlayerId>,
    /// Ability-specific extras (second target, chosen crisis, ...).
    #[serde(default)]
    pub payload: Payload,
    pub submitted_at: DateTime<Utc>,
}
