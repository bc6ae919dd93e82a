//! File-backed sinks.
//!
//! # File Structure
//!
//! ```text
//! {base_dir}/{session_id}/
//!   ├── events.jsonl    one JSON event per line, in sequence order
//!   └── snapshot.json   latest snapshot, replaced atomically
//! ```

mod log;
mod snapshot;

use std::path::{Path, PathBuf};

pub use log::FileEventLog;
pub use snapshot::FileSnapshotStore;

use alignment_core::SessionId;

use crate::repository::{Result, SinkError};

/// Platform data directory for session files.
///
/// - Linux: `~/.local/share/alignment/sessions`
/// - macOS: `~/Library/Application Support/alignment/sessions`
/// - Fallback: `./save_data/sessions`
pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "alignment")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./save_data"))
        .join("sessions")
}

/// Directory holding one session's files. Ids that could escape
/// `base_dir` are refused.
pub(crate) fn session_dir(base_dir: &Path, session: &SessionId) -> Result<PathBuf> {
    let id = session.as_str();
    let safe = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && id != "."
        && id != "..";
    if !safe {
        return Err(SinkError::InvalidKey(id.to_owned()));
    }
    Ok(base_dir.join(id))
}
