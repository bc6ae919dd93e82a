//! Session initialization: faction split, roles, objectives, mandate.
use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use sha2::{Digest, Sha256};

use crate::engine::Staging;
use crate::error::ActionError;
use crate::event::{Event, EventKind, payloads};
use crate::state::{
    Alignment, Catalog, KpiKind, PhaseKind, PlayerId, RoleKind, SessionId, SessionState,
};

use super::faction_notice;

/// Seed used for role assignment: the requested one, then the configured one,
/// then a hash of the session id.
pub fn session_seed(state: &SessionState, requested: Option<u64>) -> u64 {
    requested
        .or(state.settings.seed)
        .unwrap_or_else(|| seed_from_id(&state.id))
}

fn seed_from_id(id: &SessionId) -> u64 {
    let digest = Sha256::digest(id.as_str().as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Number of aligned players for a table of `players`.
pub fn aligned_count(players: usize) -> usize {
    (players / 4).max(1)
}

/// Splits the table, hands out roles and objectives, activates a mandate, and
/// opens day one.
pub fn initialize(
    state: &SessionState,
    catalog: &Catalog,
    seed: Option<u64>,
    now: DateTime<Utc>,
) -> Result<Vec<Event>, ActionError> {
    if state.is_over() {
        return Err(ActionError::SessionOver);
    }
    if state.phase.kind != PhaseKind::Lobby {
        return Err(ActionError::AlreadyStarted);
    }
    let ids: Vec<PlayerId> = state.alive_players().map(|p| p.id.clone()).collect();
    let required = state.settings.min_players;
    if ids.len() < required {
        return Err(ActionError::NotEnoughPlayers {
            required,
            found: ids.len(),
        });
    }

    let seed = session_seed(state, seed);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut shuffled = ids.clone();
    shuffled.shuffle(&mut rng);
    let aligned: Vec<PlayerId> = shuffled
        .into_iter()
        .take(aligned_count(ids.len()))
        .collect();

    let mut staging = Staging::new(state);
    let starting = state.settings.starting_tokens;
    for (index, id) in ids.iter().enumerate() {
        let role = RoleKind::ASSIGNMENT_ORDER[index % RoleKind::ASSIGNMENT_ORDER.len()];
        let kpi = KpiKind::ASSIGNMENT_ORDER[index % KpiKind::ASSIGNMENT_ORDER.len()];
        let alignment = if aligned.contains(id) {
            Alignment::Aligned
        } else {
            Alignment::Human
        };
        let event = Event::new(EventKind::RoleAssigned, state.id.clone(), now)
            .private_to(id)
            .with(&payloads::RoleAssigned {
                role_type: Some(role),
                role_name: role.title().to_owned(),
                role_description: role.description().to_owned(),
                alignment,
                kpi_type: Some(kpi),
                kpi_description: kpi.description().to_owned(),
                ai_equity: match alignment {
                    Alignment::Aligned => starting.saturating_add(1),
                    Alignment::Human => 0,
                },
            });
        staging.emit(event);
    }

    let names: Vec<&str> = aligned
        .iter()
        .filter_map(|id| state.player(id.as_str()))
        .map(|p| p.name.as_str())
        .collect();
    let notice = faction_notice(
        staging.state(),
        &format!("You are aligned. Your faction: {}.", names.join(", ")),
        now,
    );
    staging.emit_all(notice);

    if let Some(mandate) = catalog.mandate_for_seed(seed) {
        let bonus = mandate.effects.starting_tokens_bonus;
        staging.emit(
            Event::new(EventKind::MandateActivated, state.id.clone(), now).with(
                &payloads::MandateActivated {
                    mandate: mandate.clone(),
                },
            ),
        );
        if bonus > 0 {
            for id in &ids {
                staging.emit(
                    Event::new(EventKind::TokensAwarded, state.id.clone(), now)
                        .about(id)
                        .with(&payloads::TokensChanged {
                            amount: bonus,
                            reason: format!("{} mandate", mandate.name),
                        }),
                );
            }
        }
    }

    let duration = state
        .settings
        .phase_durations
        .of(PhaseKind::Sitrep)
        .unwrap_or_default();
    staging.emit(
        Event::new(EventKind::GameStarted, state.id.clone(), now).with(&payloads::PhaseChanged {
            phase_type: Some(PhaseKind::Sitrep),
            previous_phase: Some(PhaseKind::Lobby),
            duration,
            day_number: 1,
        }),
    );
    Ok(staging.into_events())
}
