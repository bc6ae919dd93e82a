//! Session lifecycle through the public runtime API.
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use alignment_core::event::payloads;
use alignment_core::{
    Action, ActionError, ActionKind, EventKind, PhaseDurations, PhaseKind, SessionId,
    SessionSettings,
};
use alignment_runtime::{
    EventBus, InMemoryEventSink, InMemorySnapshotStore, Runtime, RuntimeConfig, RuntimeError,
    SessionHandle, SessionRegistry, SessionStatus, Sinks,
};

const PLAYERS: [&str; 4] = ["ana", "bo", "cy", "dee"];

fn action(session: &SessionId, kind: ActionKind) -> Action {
    Action::new(kind, session.clone(), Utc::now())
}

async fn join_all(handle: &SessionHandle) {
    for player in PLAYERS {
        let joined = handle
            .post_action(action(handle.id(), ActionKind::JoinGame).by(player))
            .await
            .unwrap();
        assert_eq!(joined.len(), 1);
    }
}

/// Polls until `check` holds; the outbound worker runs on its own task.
async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn joining_and_starting_a_game_numbers_every_event() {
    let runtime = Runtime::builder().health_monitor(false).build().await.unwrap();
    let handle = runtime.create_session("table-1").await.unwrap();
    join_all(&handle).await;

    let started = handle
        .post_action(action(handle.id(), ActionKind::InitializeSession).field("seed", 7u64))
        .await
        .unwrap();
    assert!(started.iter().any(|e| e.kind == EventKind::GameStarted));
    let seqs: Vec<u64> = started.iter().map(|e| e.seq).collect();
    let expected: Vec<u64> = (5..5 + started.len() as u64).collect();
    assert_eq!(seqs, expected);
    assert_eq!(started[0].id, format!("table-1-{}", started[0].seq));

    let state = handle.state().await.unwrap();
    assert_eq!(state.phase.kind, PhaseKind::Sitrep);
    assert_eq!(state.players.len(), PLAYERS.len());
    assert_eq!(state.last_seq, 4 + started.len() as u64);
    assert_eq!(
        runtime.scheduler().armed(handle.id()),
        vec![PhaseKind::Sitrep]
    );

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn creating_an_existing_session_returns_the_running_one() {
    let runtime = Runtime::builder().health_monitor(false).build().await.unwrap();
    let first = runtime.create_session("dup").await.unwrap();
    first
        .post_action(action(first.id(), ActionKind::JoinGame).by("ana"))
        .await
        .unwrap();

    let second = runtime.create_session("dup").await.unwrap();
    assert_eq!(second.state().await.unwrap().players.len(), 1);
    assert_eq!(runtime.stats().await.active, 1);
    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn invalid_settings_are_refused() {
    let registry = SessionRegistry::new(RuntimeConfig::default(), Sinks::in_memory(EventBus::new()));
    let settings = SessionSettings::default().with_min_players(0);
    assert!(matches!(
        registry.create_with("bad", settings).await,
        Err(RuntimeError::InvalidSettings(_))
    ));
    assert!(matches!(
        registry.get(&SessionId::from("bad")).await,
        Err(RuntimeError::SessionNotFound(_))
    ));
}

#[tokio::test]
async fn rejected_actions_answer_the_caller_and_notify_the_player() {
    let runtime = Runtime::builder().health_monitor(false).build().await.unwrap();
    let handle = runtime.create_session("notice").await.unwrap();
    let (mut public_rx, mut private_rx) = runtime
        .event_bus()
        .subscribe_player(handle.id(), &"ana".into());
    handle
        .post_action(action(handle.id(), ActionKind::JoinGame).by("ana"))
        .await
        .unwrap();

    let blank = action(handle.id(), ActionKind::SendMessage)
        .by("ana")
        .field("message", "  ");
    let result = handle.post_action(blank).await;
    assert!(matches!(
        result,
        Err(RuntimeError::Rejected(ActionError::EmptyMessage))
    ));

    let joined = public_rx.recv().await.unwrap();
    assert_eq!(joined.kind, EventKind::PlayerJoined);
    let notice = private_rx.recv().await.unwrap();
    assert_eq!(notice.kind, EventKind::SystemMessage);
    let body: payloads::SystemMessage = notice.payload_as();
    assert_eq!(body.code.as_deref(), Some("empty_message"));

    // Rejections leave state and the sequence untouched.
    assert_eq!(handle.state().await.unwrap().last_seq, 1);
    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn a_rejected_submission_notifies_the_player_and_the_actor_carries_on() {
    let runtime = Runtime::builder().health_monitor(false).build().await.unwrap();
    let handle = runtime.create_session("fire-and-forget").await.unwrap();
    let (_public_rx, mut private_rx) = runtime
        .event_bus()
        .subscribe_player(handle.id(), &"ana".into());
    handle
        .post_action(action(handle.id(), ActionKind::JoinGame).by("ana"))
        .await
        .unwrap();

    let blank = action(handle.id(), ActionKind::SendMessage)
        .by("ana")
        .field("message", "");
    handle.submit(blank).unwrap();
    handle
        .submit(action(handle.id(), ActionKind::JoinGame).by("bo"))
        .unwrap();

    let notice = private_rx.recv().await.unwrap();
    let body: payloads::SystemMessage = notice.payload_as();
    assert_eq!(body.code.as_deref(), Some("empty_message"));
    eventually(|| handle.health().processed == 3).await;
    let state = handle.state().await.unwrap();
    assert_eq!(state.players.len(), 2);
    assert_eq!(state.last_seq, 2);
    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn a_full_inbound_queue_drops_instead_of_blocking() {
    let config = RuntimeConfig::default().with_inbound_queue_capacity(1);
    let registry = SessionRegistry::new(config, Sinks::in_memory(EventBus::new()));
    let handle = registry.create("busy").await.unwrap();

    // The actor cannot run until this task yields, so the queue stays full.
    handle
        .submit(action(handle.id(), ActionKind::JoinGame).by("ana"))
        .unwrap();
    let overflow = handle.submit(action(handle.id(), ActionKind::JoinGame).by("bo"));
    assert!(matches!(overflow, Err(RuntimeError::QueueFull { .. })));
    assert_eq!(handle.health().dropped, 1);

    eventually(|| handle.health().processed == 1).await;
    let state = handle.state().await.unwrap();
    assert_eq!(state.players.len(), 1);
    registry.shutdown_all().await;
}

#[tokio::test]
async fn persistence_failures_are_counted_and_do_not_roll_back() {
    let events = Arc::new(InMemoryEventSink::new());
    events.set_offline(true);
    let runtime = Runtime::builder()
        .event_sink(events.clone())
        .snapshot_store(Arc::new(InMemorySnapshotStore::new()))
        .health_monitor(false)
        .build()
        .await
        .unwrap();
    let handle = runtime.create_session("offline").await.unwrap();
    handle
        .post_action(action(handle.id(), ActionKind::JoinGame).by("ana"))
        .await
        .unwrap();

    eventually(|| handle.health().persistence_failures == 1).await;
    assert_eq!(handle.state().await.unwrap().players.len(), 1);
    assert!(events.events(handle.id()).unwrap().is_empty());

    events.set_offline(false);
    handle
        .post_action(action(handle.id(), ActionKind::JoinGame).by("bo"))
        .await
        .unwrap();
    eventually(|| handle.health().persisted == 1).await;
    let stored = events.events(handle.id()).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].seq, 2);
    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn stopped_sessions_refuse_new_work() {
    let runtime = Runtime::builder().health_monitor(false).build().await.unwrap();
    let handle = runtime.create_session("short").await.unwrap();
    let registry = runtime.registry();
    registry.remove(handle.id()).await.unwrap();

    assert_eq!(handle.status(), SessionStatus::Stopped);
    assert!(matches!(
        handle.submit(action(handle.id(), ActionKind::JoinGame).by("ana")),
        Err(RuntimeError::CommandChannelClosed)
    ));
    runtime.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn phase_timers_drive_the_session_forward() {
    let settings = SessionSettings::default()
        .with_phase_durations(PhaseDurations::uniform(Duration::from_secs(2)));
    let config = RuntimeConfig::default()
        .with_scheduler_tick(Duration::from_millis(100))
        .with_default_settings(settings);
    let runtime = Runtime::builder()
        .config(config)
        .health_monitor(false)
        .build()
        .await
        .unwrap();
    let handle = runtime.create_session("timed").await.unwrap();
    join_all(&handle).await;
    handle
        .post_action(action(handle.id(), ActionKind::InitializeSession))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert_eq!(handle.state().await.unwrap().phase.kind, PhaseKind::PulseCheck);

    tokio::time::sleep(Duration::from_secs(2)).await;
    let state = handle.state().await.unwrap();
    assert_eq!(state.phase.kind, PhaseKind::Discussion);
    assert_eq!(
        runtime.scheduler().armed(handle.id()),
        vec![PhaseKind::Discussion]
    );
    runtime.shutdown().await.unwrap();
}
