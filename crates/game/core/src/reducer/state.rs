use std::collections::{BTreeMap, BTreeSet};

use crate::state::{
    NightActionKind, Player, PlayerId, SessionState, SubmittedNightAction, VoteState,
};

/// Wraps mutable access to [`SessionState`] with structured sub-reducers.
pub struct StateReducer<'a> {
    state: &'a mut SessionState,
}

impl<'a> StateReducer<'a> {
    pub fn new(state: &'a mut SessionState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &SessionState {
        self.state
    }

    pub fn state_mut(&mut self) -> &mut SessionState {
        self.state
    }

    pub fn players(&mut self) -> PlayersReducer<'_> {
        PlayersReducer {
            players: &mut self.state.players,
        }
    }

    pub fn night(&mut self) -> NightReducer<'_> {
        NightReducer {
            actions: &mut self.state.night_actions,
            blocked: &mut self.state.blocked_tonight,
            protected: &mut self.state.protected_tonight,
        }
    }

    pub fn vote(&mut self) -> Option<&mut VoteState> {
        self.state.vote.as_mut()
    }

    pub fn record_seq(&mut self, seq: u64) {
        self.state.last_seq = self.state.last_seq.max(seq);
    }
}

pub struct PlayersReducer<'a> {
    players: &'a mut BTreeMap<PlayerId, Player>,
}

impl<'a> PlayersReducer<'a> {
    /// Inserts a new player. Returns `false` if the id is already taken.
    pub fn join(&mut self, player: Player) -> bool {
        if self.players.contains_key(&player.id) {
            return false;
        }
        self.players.insert(player.id.clone(), player);
        true
    }

    /// Mutable access to a living player. Dead players are frozen.
    pub fn alive_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players.get_mut(id).filter(|player| player.alive)
    }

    pub fn for_each_alive(&mut self, mut f: impl FnMut(&mut Player)) {
        self.players
            .values_mut()
            .filter(|player| player.alive)
            .for_each(|player| f(player));
    }

    /// Marks a living player dead. Returns the player for reveal updates.
    pub fn kill(&mut self, id: &str) -> Option<&mut Player> {
        let player = self.alive_mut(id)?;
        player.alive = false;
        Some(player)
    }
}

pub struct NightReducer<'a> {
    actions: &'a mut BTreeMap<PlayerId, SubmittedNightAction>,
    blocked: &'a mut BTreeSet<PlayerId>,
    protected: &'a mut BTreeSet<PlayerId>,
}

impl<'a> NightReducer<'a> {
    /// Stores a player's night intent, replacing any earlier one.
    pub fn submit(&mut self, action: SubmittedNightAction) {
        self.actions.insert(action.player_id.clone(), action);
    }

    pub fn withdraw(&mut self, player: &str) {
        self.actions.remove(player);
    }

    /// Rewrites a player's intent to shipping milestones, inserting one if
    /// they had none.
    pub fn force_milestones(&mut self, player: &PlayerId, template: SubmittedNightAction) {
        match self.actions.get_mut(player) {
            Some(action) => {
                action.kind = NightActionKind::ProjectMilestones;
                action.target_id = None;
            }
            None => {
                self.actions.insert(player.clone(), template);
            }
        }
    }

    pub fn block(&mut self, player: PlayerId) -> bool {
        self.blocked.insert(player)
    }

    pub fn protect(&mut self, player: PlayerId) -> bool {
        self.protected.insert(player)
    }

    /// Drops every per-night record.
    pub fn clear(&mut self) {
        self.actions.clear();
        self.blocked.clear();
        self.protected.clear();
    }
}
