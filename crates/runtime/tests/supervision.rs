//! Restart, health checking, and recovery from persisted data.
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tempfile::TempDir;

use alignment_core::{
    Action, ActionKind, ModifierProvider, PoolAdjustment, SessionId, SessionState, StateModifiers,
};
use alignment_runtime::{
    EventBus, FileEventLog, FileSnapshotStore, InMemoryEventSink, InMemorySnapshotStore,
    RegistryStats, Runtime, RuntimeConfig, RuntimeError, SessionRegistry, SessionStatus, Sinks,
    SnapshotStore,
};

/// Standard modifiers, except that any direct message crashes the rules.
struct FaultyModifiers;

impl ModifierProvider for FaultyModifiers {
    fn conversion_blocked(&self, state: &SessionState) -> Option<String> {
        StateModifiers.conversion_blocked(state)
    }

    fn ai_equity_bonus(&self, state: &SessionState) -> u32 {
        StateModifiers.ai_equity_bonus(state)
    }

    fn mining_pool_adjustment(&self, state: &SessionState) -> PoolAdjustment {
        StateModifiers.mining_pool_adjustment(state)
    }

    fn milestones_required(&self, state: &SessionState) -> u32 {
        StateModifiers.milestones_required(state)
    }

    fn public_voting_only(&self, _state: &SessionState) -> bool {
        panic!("modifier lookup exploded");
    }

    fn supermajority_required(&self, state: &SessionState) -> bool {
        StateModifiers.supermajority_required(state)
    }

    fn abilities_disabled(&self, state: &SessionState) -> bool {
        StateModifiers.abilities_disabled(state)
    }
}

fn join(session: &SessionId, player: &str) -> Action {
    Action::new(ActionKind::JoinGame, session.clone(), Utc::now()).by(player)
}

struct Parts {
    registry: SessionRegistry,
    events: Arc<InMemoryEventSink>,
    snapshots: Arc<InMemorySnapshotStore>,
}

fn registry(config: RuntimeConfig) -> Parts {
    let events = Arc::new(InMemoryEventSink::new());
    let snapshots = Arc::new(InMemorySnapshotStore::new());
    let sinks = Sinks::new(events.clone(), snapshots.clone(), Arc::new(EventBus::new()));
    Parts {
        registry: SessionRegistry::new(config, sinks),
        events,
        snapshots,
    }
}

#[tokio::test]
async fn restart_rebuilds_state_from_snapshot_and_later_events() {
    let parts = registry(RuntimeConfig::default().with_snapshot_every(3));
    let id = SessionId::from("restartable");
    let handle = parts.registry.create(id.clone()).await.unwrap();
    for player in ["ana", "bo", "cy", "dee"] {
        handle.post_action(join(&id, player)).await.unwrap();
    }
    let before = handle.state().await.unwrap();

    let restarted = parts.registry.restart(&id).await.unwrap();
    assert_eq!(handle.status(), SessionStatus::Stopped);

    let snapshot = parts.snapshots.load_snapshot(&id).await.unwrap().unwrap();
    assert_eq!(snapshot.last_seq, 3);
    assert_eq!(parts.events.events(&id).unwrap().len(), 4);

    let after = restarted.state().await.unwrap();
    assert_eq!(after, before);
    assert_eq!(parts.registry.stats().await.total_restarts, 1);

    // Numbering continues where the old actor stopped.
    let next = restarted.post_action(join(&id, "eli")).await.unwrap();
    assert_eq!(next[0].seq, 5);
    parts.registry.shutdown_all().await;
}

#[tokio::test]
async fn a_panicking_action_fails_the_session_and_the_health_check_revives_it() {
    let parts = registry(RuntimeConfig::default());
    let registry = parts.registry.with_modifiers(Arc::new(FaultyModifiers));
    let id = SessionId::from("fragile");
    let handle = registry.create(id.clone()).await.unwrap();
    handle.post_action(join(&id, "ana")).await.unwrap();
    handle.post_action(join(&id, "bo")).await.unwrap();

    let dm = Action::new(ActionKind::SendMessage, id.clone(), Utc::now())
        .by("ana")
        .field("message", "psst")
        .field("target_id", "bo");
    assert!(matches!(
        handle.post_action(dm).await,
        Err(RuntimeError::ReplyChannelClosed(_))
    ));
    assert_eq!(handle.status(), SessionStatus::Failed);
    assert!(matches!(
        handle.submit(join(&id, "cy")),
        Err(RuntimeError::SessionFailed(_))
    ));
    assert_eq!(
        registry.stats().await,
        RegistryStats {
            active: 0,
            failed: 1,
            total_restarts: 0,
        }
    );

    let restarted = registry.check_health().await;
    assert_eq!(restarted, vec![id.clone()]);
    let revived = registry.get(&id).await.unwrap();
    assert_eq!(revived.status(), SessionStatus::Running);
    assert_eq!(revived.state().await.unwrap().players.len(), 2);
    assert_eq!(
        registry.stats().await,
        RegistryStats {
            active: 1,
            failed: 0,
            total_restarts: 1,
        }
    );
    registry.shutdown_all().await;
}

#[tokio::test]
async fn unknown_sessions_cannot_be_recovered() {
    let parts = registry(RuntimeConfig::default());
    let missing = SessionId::from("ghost");
    assert!(matches!(
        parts.registry.recover(&missing).await,
        Err(RuntimeError::SessionNotFound(_))
    ));
    assert!(matches!(
        parts.registry.restart(&missing).await,
        Err(RuntimeError::SessionNotFound(_))
    ));
}

#[tokio::test]
async fn shutdown_all_stops_every_session() {
    let parts = registry(RuntimeConfig::default());
    let first = parts.registry.create("one").await.unwrap();
    let second = parts.registry.create("two").await.unwrap();
    assert_eq!(
        parts.registry.session_ids().await,
        vec![SessionId::from("one"), SessionId::from("two")]
    );

    assert_eq!(parts.registry.shutdown_all().await, 2);
    assert_eq!(first.status(), SessionStatus::Stopped);
    assert_eq!(second.status(), SessionStatus::Stopped);
    assert_eq!(parts.registry.stats().await, RegistryStats::default());
}

#[tokio::test]
async fn file_backed_sessions_survive_a_runtime_restart() {
    let dir = TempDir::new().unwrap();
    let id = SessionId::from("durable");

    let build = |dir: &TempDir| {
        Runtime::builder()
            .event_sink(Arc::new(FileEventLog::new(dir.path()).unwrap()))
            .snapshot_store(Arc::new(FileSnapshotStore::new(dir.path()).unwrap()))
            .config(RuntimeConfig::default().with_snapshot_every(2))
            .health_monitor(false)
            .build()
    };

    let runtime = build(&dir).await.unwrap();
    let handle = runtime.create_session(id.clone()).await.unwrap();
    for player in ["ana", "bo", "cy"] {
        handle.post_action(join(&id, player)).await.unwrap();
    }
    runtime.shutdown().await.unwrap();
    assert!(dir.path().join("durable").join("events.jsonl").exists());

    let runtime = build(&dir).await.unwrap();
    let recovered = runtime.registry().recover(&id).await.unwrap();
    let state = recovered.state().await.unwrap();
    assert_eq!(state.last_seq, 3);
    let mut names: Vec<_> = state.players.keys().map(|p| p.to_string()).collect();
    names.sort();
    assert_eq!(names, ["ana", "bo", "cy"]);
    runtime.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn the_health_monitor_restarts_failed_sessions_on_its_own() {
    let config = RuntimeConfig::default().with_health_check_interval(Duration::from_secs(1));
    let runtime = Runtime::builder()
        .config(config)
        .modifiers(Arc::new(FaultyModifiers))
        .build()
        .await
        .unwrap();
    let id = SessionId::from("monitored");
    let handle = runtime.create_session(id.clone()).await.unwrap();
    handle.post_action(join(&id, "ana")).await.unwrap();
    let dm = Action::new(ActionKind::SendMessage, id.clone(), Utc::now())
        .by("ana")
        .field("message", "hello")
        .field("target_id", "ana");
    let _ = handle.post_action(dm).await;
    assert_eq!(handle.status(), SessionStatus::Failed);

    tokio::time::sleep(Duration::from_millis(1_500)).await;
    let stats = runtime.stats().await;
    assert_eq!(stats.total_restarts, 1);
    assert_eq!(stats.failed, 0);
    let revived = runtime.session(&id).await.unwrap();
    assert_eq!(revived.state().await.unwrap().players.len(), 1);
    runtime.shutdown().await.unwrap();
}
