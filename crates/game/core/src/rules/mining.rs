//! Liquidity-pool admission for night mining.
//!
//! Each night only a limited number of mining requests succeed. The pool is
//! sized from the living human count, adjusted by active modifiers, and when
//! demand exceeds it requests are admitted by a fixed priority order with no
//! randomness.
use std::collections::BTreeMap;

use crate::error::ActionError;
use crate::state::{Alignment, PhaseKind, PlayerId, SessionState};

use super::modifiers::PoolAdjustment;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MiningRequest {
    pub miner_id: PlayerId,
    /// The player who receives the token. Never the miner.
    pub target_id: PlayerId,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MiningResult {
    /// Winning miner → mined-for player.
    pub winners: BTreeMap<PlayerId, PlayerId>,
    /// Miners whose valid request lost the allocation, in id order.
    pub failed: Vec<PlayerId>,
    pub total_requests: usize,
    pub pool_size: usize,
}

impl MiningResult {
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}

/// Mining slots available tonight.
///
/// `floor(humans / 2)`, halved by a reducing crisis, shifted by the flat
/// delta, and never below one while any human is alive.
pub fn pool_size(living_humans: usize, adjustment: PoolAdjustment) -> usize {
    let mut slots = (living_humans / 2) as i64;
    if adjustment.halve {
        slots /= 2;
    }
    slots += i64::from(adjustment.delta);
    if slots < 1 && living_humans > 0 {
        slots = 1;
    }
    slots.max(0) as usize
}

/// Checks a mining submission before it is queued.
pub fn validate_request(
    state: &SessionState,
    miner: &PlayerId,
    target: &PlayerId,
) -> Result<(), ActionError> {
    if state.phase.kind != PhaseKind::Night {
        return Err(ActionError::WrongPhase {
            action: "mining",
            phase: state.phase.kind,
        });
    }
    if miner == target {
        return Err(ActionError::SelfMining);
    }
    if state.alive_player(miner.as_str()).is_none() {
        return Err(ActionError::ActorDead);
    }
    if state.alive_player(target.as_str()).is_none() {
        return Err(ActionError::TargetDead(target.clone()));
    }
    Ok(())
}

fn is_valid(state: &SessionState, request: &MiningRequest) -> bool {
    request.miner_id != request.target_id
        && state.alive_player(request.miner_id.as_str()).is_some()
        && state.alive_player(request.target_id.as_str()).is_some()
}

/// Resolves tonight's requests against the pool.
pub fn allocate(
    state: &SessionState,
    requests: &[MiningRequest],
    adjustment: PoolAdjustment,
) -> MiningResult {
    let mut valid: Vec<&MiningRequest> = requests.iter().filter(|r| is_valid(state, r)).collect();
    let pool_size = pool_size(state.alive_with(Alignment::Human), adjustment);
    let total_requests = valid.len();

    if valid.len() > pool_size {
        // Prior failure first, then fewer tokens, then id.
        valid.sort_by_key(|request| {
            let miner = state.player(request.miner_id.as_str());
            let failed_before = miner.is_some_and(|p| p.mining_failed_last_night);
            let tokens = miner.map_or(0, |p| p.tokens);
            (!failed_before, tokens, request.miner_id.clone())
        });
    }

    let mut result = MiningResult {
        total_requests,
        pool_size,
        ..MiningResult::default()
    };
    for (rank, request) in valid.into_iter().enumerate() {
        if rank < pool_size {
            result
                .winners
                .insert(request.miner_id.clone(), request.target_id.clone());
        } else {
            result.failed.push(request.miner_id.clone());
        }
    }
    result.failed.sort();
    result
}
