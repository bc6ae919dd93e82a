//! File-based snapshot store.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use alignment_core::{SessionId, SessionState};

use super::session_dir;
use crate::repository::{Result, SnapshotStore};

const SNAPSHOT_FILE: &str = "snapshot.json";

/// Stores the latest snapshot of each session as JSON.
pub struct FileSnapshotStore {
    base_dir: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn snapshot_path(&self, session: &SessionId) -> Result<PathBuf> {
        Ok(session_dir(&self.base_dir, session)?.join(SNAPSHOT_FILE))
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn save_snapshot(&self, state: &SessionState) -> Result<()> {
        let path = self.snapshot_path(&state.id)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let temp_path = path.with_extension("json.tmp");

        let bytes = serde_json::to_vec(state)?;
        fs::write(&temp_path, bytes)?;

        // Atomic rename
        fs::rename(&temp_path, &path)?;

        tracing::debug!("Saved snapshot at seq {} to {}", state.last_seq, path.display());
        Ok(())
    }

    async fn load_snapshot(&self, session: &SessionId) -> Result<Option<SessionState>> {
        let path = self.snapshot_path(session)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let state = serde_json::from_slice(&bytes)?;
        Ok(Some(state))
    }
}
