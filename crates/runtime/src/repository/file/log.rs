//! Append-only JSON-lines event log.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use alignment_core::{Event, SessionId};

use super::session_dir;
use crate::repository::{EventSink, Result, SinkError};

const EVENTS_FILE: &str = "events.jsonl";

/// File-based event log, one file per session.
///
/// Every append is flushed before it returns, so an acknowledged event
/// survives a process crash. A torn final line (crash mid-write) is cut
/// off the file before it is read or appended to; a malformed line
/// anywhere else is corruption.
pub struct FileEventLog {
    base_dir: PathBuf,
    writers: Mutex<HashMap<SessionId, BufWriter<File>>>,
}

impl FileEventLog {
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self {
            base_dir,
            writers: Mutex::new(HashMap::new()),
        })
    }

    pub fn path(&self, session: &SessionId) -> Result<PathBuf> {
        Ok(session_dir(&self.base_dir, session)?.join(EVENTS_FILE))
    }

    fn open_writer(&self, session: &SessionId) -> Result<BufWriter<File>> {
        let dir = session_dir(&self.base_dir, session)?;
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(EVENTS_FILE);
        seal_tail(&path)?;
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        tracing::debug!("Opened event log: {}", path.display());
        Ok(BufWriter::new(file))
    }
}

#[async_trait]
impl EventSink for FileEventLog {
    async fn append_event(&self, session: &SessionId, event: &Event) -> Result<()> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let mut writers = self.writers.lock().map_err(|_| SinkError::LockPoisoned)?;
        if !writers.contains_key(session) {
            let writer = self.open_writer(session)?;
            writers.insert(session.clone(), writer);
        }
        let Some(writer) = writers.get_mut(session) else {
            return Err(SinkError::Unavailable(format!("no writer for {session}")));
        };
        writer.write_all(&line)?;
        writer.flush()?;
        Ok(())
    }

    async fn load_events(&self, session: &SessionId, after_seq: u64) -> Result<Vec<Event>> {
        let path = self.path(session)?;
        let contents = {
            // Held so no append lands between the repair and the read.
            let _writers = self.writers.lock().map_err(|_| SinkError::LockPoisoned)?;
            seal_tail(&path)?
        };

        let mut events = Vec::new();
        for (index, line) in contents.as_slice().lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Event>(&line) {
                Ok(event) if event.seq > after_seq => events.push(event),
                Ok(_) => {}
                Err(err) => {
                    return Err(SinkError::CorruptedData(format!(
                        "{} line {}: {}",
                        path.display(),
                        index + 1,
                        err
                    )));
                }
            }
        }
        events.sort_by_key(|event| event.seq);
        Ok(events)
    }
}

/// Makes sure the log ends on a line boundary and returns its contents.
///
/// An unterminated final line that parses is a complete event whose newline
/// never hit the disk, so it gets one. Anything else is a torn write and is
/// truncated away; it was never acknowledged.
fn seal_tail(path: &Path) -> Result<Vec<u8>> {
    let mut contents = match std::fs::read(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };
    if contents.last().is_none_or(|byte| *byte == b'\n') {
        return Ok(contents);
    }

    let keep = contents
        .iter()
        .rposition(|byte| *byte == b'\n')
        .map_or(0, |index| index + 1);
    if serde_json::from_slice::<Event>(&contents[keep..]).is_ok() {
        OpenOptions::new().append(true).open(path)?.write_all(b"\n")?;
        contents.push(b'\n');
    } else {
        tracing::warn!(
            "Truncating torn final line of {} ({} bytes)",
            path.display(),
            contents.len() - keep
        );
        OpenOptions::new().write(true).open(path)?.set_len(keep as u64)?;
        contents.truncate(keep);
    }
    Ok(contents)
}
