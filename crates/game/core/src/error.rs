//! Error types for session rules.
//!
//! Validation failures are ordinary values: a rejected action produces no
//! events and its message is relayed privately to the player who sent it.
//! Nothing in this module represents a fault; faults are the runtime's concern.

use thiserror::Error;

use crate::state::{PhaseKind, PlayerId, VoteKind};

/// Why an action was rejected.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("action requires a player id")]
    MissingActor,

    #[error("player {0} is not part of this session")]
    PlayerNotFound(PlayerId),

    #[error("eliminated players cannot act")]
    ActorDead,

    #[error("target {0} has been eliminated")]
    TargetDead(PlayerId),

    #[error("a target is required")]
    MissingTarget,

    #[error("unknown night action")]
    UnknownNightAction,

    #[error("{action} is not allowed during {phase}")]
    WrongPhase {
        action: &'static str,
        phase: PhaseKind,
    },

    #[error("no vote is in progress")]
    NoActiveVote,

    #[error("{target} is not a legal {kind} vote")]
    IllegalVoteTarget { kind: VoteKind, target: String },

    #[error("players cannot mine for themselves")]
    SelfMining,

    #[error("this action cannot target yourself")]
    SelfTarget,

    #[error("this night action requires {required} project milestones")]
    InsufficientMilestones { required: u32 },

    #[error("role ability is locked")]
    AbilityLocked,

    #[error("your role does not grant this ability")]
    AbilityNotGranted,

    #[error("role ability already used tonight")]
    AbilityAlreadyUsed,

    #[error("role abilities are suspended by the current crisis")]
    AbilitiesSuspended,

    #[error("only aligned players can attempt conversion")]
    NotAligned,

    #[error("the session is full")]
    SessionFull,

    #[error("at least {required} players are needed to start, found {found}")]
    NotEnoughPlayers { required: usize, found: usize },

    #[error("the session has already started")]
    AlreadyStarted,

    #[error("the session is over")]
    SessionOver,

    #[error("unknown crisis {0}")]
    UnknownCrisis(String),

    #[error("message is empty")]
    EmptyMessage,

    #[error("private messages are suspended; only public discussion is allowed")]
    PrivateMessagesSuspended,
}

impl ActionError {
    /// Short machine-readable code attached to private rejection notices.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingActor => "missing_actor",
            Self::PlayerNotFound(_) => "player_not_found",
            Self::ActorDead => "actor_dead",
            Self::TargetDead(_) => "target_dead",
            Self::MissingTarget => "missing_target",
            Self::UnknownNightAction => "unknown_night_action",
            Self::WrongPhase { .. } => "wrong_phase",
            Self::NoActiveVote => "no_active_vote",
            Self::IllegalVoteTarget { .. } => "illegal_vote_target",
            Self::SelfMining => "self_mining",
            Self::SelfTarget => "self_target",
            Self::InsufficientMilestones { .. } => "insufficient_milestones",
            Self::AbilityLocked => "ability_locked",
            Self::AbilityNotGranted => "ability_not_granted",
            Self::AbilityAlreadyUsed => "ability_already_used",
            Self::AbilitiesSuspended => "abilities_suspended",
            Self::NotAligned => "not_aligned",
            Self::SessionFull => "session_full",
            Self::NotEnoughPlayers { .. } => "not_enough_players",
            Self::AlreadyStarted => "already_started",
            Self::SessionOver => "session_over",
            Self::UnknownCrisis(_) => "unknown_crisis",
            Self::EmptyMessage => "empty_message",
            Self::PrivateMessagesSuspended => "private_messages_suspended",
        }
    }
}

/// Invalid [`crate::SessionSettings`].
#[derive(Clone, Debug, PartialEq, Error)]
pub enum SettingsError {
    #[error("min_players must be at least 1")]
    MinPlayersZero,

    #[error("max_players ({max}) is below min_players ({min})")]
    PlayerBounds { min: usize, max: usize },

    #[error("voting_threshold {0} must be in (0, 1]")]
    VotingThreshold(f64),
}
