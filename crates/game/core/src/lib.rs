//! Deterministic session rules for the alignment game.
//!
//! `alignment-core` defines the canonical model (state, events, actions) and
//! the pure functions that move it forward. State changes only by folding
//! events through [`reducer::apply`]; events are produced only by
//! [`SessionEngine::execute`] from a validated [`Action`]. Nothing in this
//! crate performs I/O or reads a clock, so replaying a log always rebuilds
//! the same state.
pub mod action;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod reducer;
pub mod rules;
pub mod state;

pub use action::{Action, ActionKind};
pub use config::{PhaseDurations, SessionSettings};
pub use engine::{SessionEngine, Staging};
pub use error::{ActionError, SettingsError};
pub use event::{Event, EventKind, Payload, Visibility};
pub use reducer::{apply, replay};
pub use rules::{ModifierProvider, PoolAdjustment, StateModifiers};
pub use state::{
    Alignment, Catalog, Crisis, CrisisEffects, Faction, Kpi, KpiKind, Mandate, MandateEffects,
    NightActionKind, Phase, PhaseKind, Player, PlayerId, Role, RoleKind, SessionId, SessionState,
    SubmittedNightAction, VoteKind, VoteState, WinCondition,
};
