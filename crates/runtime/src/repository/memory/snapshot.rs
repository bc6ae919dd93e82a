//! In-memory snapshot store.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use alignment_core::{SessionId, SessionState};

use crate::repository::{Result, SinkError, SnapshotStore};

/// Keeps the latest snapshot per session.
#[derive(Default)]
pub struct InMemorySnapshotStore {
    snapshots: RwLock<HashMap<SessionId, SessionState>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn save_snapshot(&self, state: &SessionState) -> Result<()> {
        let mut snapshots = self
            .snapshots
            .write()
            .map_err(|_| SinkError::LockPoisoned)?;
        snapshots.insert(state.id.clone(), state.clone());
        Ok(())
    }

    async fn load_snapshot(&self, session: &SessionId) -> Result<Option<SessionState>> {
        let snapshots = self
            .snapshots
            .read()
            .map_err(|_| SinkError::LockPoisoned)?;
        Ok(snapshots.get(session).cloned())
    }
}
