use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use super::PlayerId;
use super::night::NightActionKind;

/// Faction membership. Humans defend; aligned players are the infiltrators.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
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
pub enum Alignment {
    #[default]
    Human,
    Aligned,
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
pub enum RoleKind {
    Ciso,
    Ceo,
    Cto,
    Coo,
    Cfo,
    Ethics,
    Platforms,
    Intern,
}

impl RoleKind {
    /// Roles handed out in order during assignment.
    pub const ASSIGNMENT_ORDER: [RoleKind; 7] = [
        RoleKind::Ciso,
        RoleKind::Cto,
        RoleKind::Coo,
        RoleKind::Cfo,
        RoleKind::Ethics,
        RoleKind::Platforms,
        RoleKind::Intern,
    ];

    /// The night ability this role unlocks, if any.
    pub const fn ability(self) -> Option<NightActionKind> {
        match self {
            Self::Ethics => Some(NightActionKind::RunAudit),
            Self::Cto => Some(NightActionKind::OverclockServers),
            Self::Ciso => Some(NightActionKind::IsolateNode),
            Self::Ceo => Some(NightActionKind::PerformanceReview),
            Self::Cfo => Some(NightActionKind::ReallocateBudget),
            Self::Coo => Some(NightActionKind::Pivot),
            Self::Platforms => Some(NightActionKind::DeployHotfix),
            Self::Intern => None,
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            Self::Ciso => "Chief Information Security Officer",
            Self::Ceo => "Chief Executive Officer",
            Self::Cto => "Chief Technology Officer",
            Self::Coo => "Chief Operating Officer",
            Self::Cfo => "Chief Financial Officer",
            Self::Ethics => "VP, Ethics & Alignment",
            Self::Platforms => "VP, Platforms",
            Self::Intern => "Intern",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Ciso => "Can isolate a node, blocking its owner for the night.",
            Self::Ceo => "Can order a performance review, forcing a target to ship milestones.",
            Self::Cto => "Can overclock servers, minting a token for a target and themselves.",
            Self::Coo => "Can pivot strategy, choosing the next crisis.",
            Self::Cfo => "Can reallocate budget, moving a token between players.",
            Self::Ethics => "Can run an audit that publicly clears a target.",
            Self::Platforms => "Can deploy a hotfix that redacts part of the next report.",
            Self::Intern => "No special ability.",
        }
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub kind: RoleKind,
    pub name: String,
    pub description: String,
    pub unlocked: bool,
}

impl Role {
    pub fn new(kind: RoleKind) -> Self {
        Self {
            kind,
            name: kind.title().to_owned(),
            description: kind.description().to_owned(),
            unlocked: false,
        }
    }
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
pub enum KpiKind {
    /// Vote correctly to eliminate infiltrators.
    Inquisitor,
    /// Keep the CISO alive until the target day.
    Guardian,
    /// End with exactly two humans alive.
    SuccessionPlanner,
    /// End with the most tokens.
    Capitalist,
    /// Be eliminated unanimously.
    Scapegoat,
}

impl KpiKind {
    pub const ASSIGNMENT_ORDER: [KpiKind; 5] = [
        KpiKind::Inquisitor,
        KpiKind::Guardian,
        KpiKind::SuccessionPlanner,
        KpiKind::Capitalist,
        KpiKind::Scapegoat,
    ];

    pub const fn target(self) -> u32 {
        match self {
            Self::Inquisitor => 3,
            Self::Guardian => 4,
            Self::SuccessionPlanner => 2,
            Self::Capitalist | Self::Scapegoat => 1,
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Inquisitor => "Vote to eliminate an aligned player three times.",
            Self::Guardian => "Keep the CISO alive until day four.",
            Self::SuccessionPlanner => "Finish with exactly two humans alive.",
            Self::Capitalist => "Finish with the most tokens.",
            Self::Scapegoat => "Get eliminated by a unanimous vote.",
        }
    }

    pub const fn reward(self) -> &'static str {
        match self {
            Self::Inquisitor => "Two extra tokens for each correct vote",
            Self::Guardian => "Alternate win: the CISO survives to day four",
            Self::SuccessionPlanner => "Alternate win: exactly two humans remain",
            Self::Capitalist => "Alternate win: most tokens at the end",
            Self::Scapegoat => "Alternate win: eliminated unanimously",
        }
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// A player's secret personal objective.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kpi {
    pub kind: KpiKind,
    pub description: String,
    pub progress: u32,
    pub target: u32,
    pub completed: bool,
}

impl Kpi {
    pub fn new(kind: KpiKind) -> Self {
        Self {
            kind,
            description: kind.description().to_owned(),
            progress: 0,
            target: kind.target(),
            completed: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub job_title: String,
    pub joined_at: DateTime<Utc>,
    pub alive: bool,
    pub alignment: Alignment,
    pub tokens: u32,
    /// Project milestones shipped; gates role abilities.
    pub milestones: u32,
    pub role: Option<Role>,
    pub kpi: Option<Kpi>,
    /// Attacker-side counter compared against a target's tokens on conversion.
    pub ai_equity: u32,
    pub has_used_ability: bool,
    pub last_night_action: Option<NightActionKind>,
    /// Set when the player's last mining request lost the slot lottery.
    pub mining_failed_last_night: bool,
    pub status_message: String,
    pub slack_status: String,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>, joined_at: DateTime<Utc>, tokens: u32) -> Self {
        Self {
            id,
            name: name.into(),
            job_title: String::new(),
            joined_at,
            alive: true,
            alignment: Alignment::Human,
            tokens,
            milestones: 0,
            role: None,
            kpi: None,
            ai_equity: 0,
            has_used_ability: false,
            last_night_action: None,
            mining_failed_last_night: false,
            status_message: String::new(),
            slack_status: String::new(),
        }
    }

    pub fn is_aligned(&self) -> bool {
        self.alignment == Alignment::Aligned
    }

    pub fn role_kind(&self) -> Option<RoleKind> {
        self.role.as_ref().map(|role| role.kind)
    }

    pub fn role_unlocked(&self) -> bool {
        self.role.as_ref().is_some_and(|role| role.unlocked)
    }
}
