//! In-memory event log implementation.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use alignment_core::{Event, SessionId};

use crate::repository::{EventSink, Result, SinkError};

/// In-memory event log for testing and development.
///
/// Thread-safe but not persistent across process restarts. Can be switched
/// offline to exercise the durability-gap path.
#[derive(Default)]
pub struct InMemoryEventSink {
    logs: RwLock<HashMap<SessionId, Vec<Event>>>,
    offline: AtomicBool,
}

impl InMemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every append fails with [`SinkError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// All persisted events of a session (for testing/debugging).
    pub fn events(&self, session: &SessionId) -> Result<Vec<Event>> {
        let logs = self.logs.read().map_err(|_| SinkError::LockPoisoned)?;
        Ok(logs.get(session).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl EventSink for InMemoryEventSink {
    async fn append_event(&self, session: &SessionId, event: &Event) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(SinkError::Unavailable("event log is offline".into()));
        }
        let mut logs = self.logs.write().map_err(|_| SinkError::LockPoisoned)?;
        logs.entry(session.clone()).or_default().push(event.clone());
        Ok(())
    }

    async fn load_events(&self, session: &SessionId, after_seq: u64) -> Result<Vec<Event>> {
        let logs = self.logs.read().map_err(|_| SinkError::LockPoisoned)?;
        let mut events: Vec<Event> = logs
            .get(session)
            .map(|log| {
                log.iter()
                    .filter(|event| event.seq > after_seq)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        events.sort_by_key(|event| event.seq);
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use alignment_core::EventKind;

    fn event(seq: u64) -> Event {
        let mut event = Event::new(EventKind::ChatMessage, SessionId::from("s"), Utc::now());
        event.seq = seq;
        event
    }

    #[tokio::test]
    async fn loads_only_events_after_the_cursor() {
        let sink = InMemoryEventSink::new();
        let session = SessionId::from("s");
        for seq in 1..=5 {
            sink.append_event(&session, &event(seq)).await.unwrap();
        }

        let tail = sink.load_events(&session, 3).await.unwrap();
        assert_eq!(tail.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![4, 5]);
        assert!(
            sink.load_events(&SessionId::from("other"), 0)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn offline_appends_fail() {
        let sink = InMemoryEventSink::new();
        sink.set_offline(true);
        let err = sink
            .append_event(&SessionId::from("s"), &event(1))
            .await
            .unwrap_err();
        assert!(matches!(err, SinkError::Unavailable(_)));
    }
}
