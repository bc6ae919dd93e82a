//! Fixtures shared by the rule tests.
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use crate::config::SessionSettings;
use crate::state::{
    Alignment, Crisis, CrisisEffects, Mandate, MandateEffects, NightActionKind, Phase, PhaseKind,
    Player, PlayerId, Role, RoleKind, SessionId, SessionState, SubmittedNightAction,
};

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

/// A started session in the night phase of day 1 with the given
/// `(id, alignment, tokens)` players, all alive.
pub fn session_with(players: &[(&str, Alignment, u32)]) -> SessionState {
    let mut state = SessionState::new(SessionId::from("test"), SessionSettings::default(), now());
    state.day_number = 1;
    state.phase = Phase::new(PhaseKind::Night, now(), Duration::from_secs(30));
    for (id, alignment, tokens) in players {
        let mut player = Player::new(PlayerId::from(*id), id.to_uppercase(), now(), *tokens);
        player.alignment = *alignment;
        state.players.insert(player.id.clone(), player);
    }
    state
}

pub fn at_phase(mut state: SessionState, kind: PhaseKind) -> SessionState {
    state.phase = Phase::new(kind, now(), Duration::from_secs(30));
    state
}

pub fn with_crisis(mut state: SessionState, effects: CrisisEffects) -> SessionState {
    state.crisis = Some(Crisis {
        kind: "TEST_CRISIS".into(),
        title: "Test Crisis".into(),
        description: String::new(),
        effects,
    });
    state
}

pub fn with_mandate(mut state: SessionState, effects: MandateEffects) -> SessionState {
    state.mandate = Some(Mandate {
        kind: "TEST_MANDATE".into(),
        name: "Test Mandate".into(),
        description: String::new(),
        effects,
    });
    state
}

/// Gives a player an unlocked role and enough milestones to use it.
pub fn unlock(state: &mut SessionState, id: &str, kind: RoleKind) {
    let required = state.settings.milestones_for_abilities;
    let player = state.players.get_mut(id).unwrap();
    let mut role = Role::new(kind);
    role.unlocked = true;
    player.role = Some(role);
    player.milestones = required;
}

pub fn submit(
    state: &mut SessionState,
    player: &str,
    kind: NightActionKind,
    target: Option<&str>,
) {
    state.night_actions.insert(
        PlayerId::from(player),
        SubmittedNightAction {
            player_id: PlayerId::from(player),
            kind,
            target_id: target.map(PlayerId::from),
            payload: Default::default(),
            submitted_at: now(),
        },
    );
}

pub fn kill(state: &mut SessionState, id: &str) {
    state.players.get_mut(id).unwrap().alive = false;
}
