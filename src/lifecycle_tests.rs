// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::testutil::{connect_options, FakeGameClientFactory};

fn profiles() -> MovementProfiles {
    let (config, _) = crate::config::Config::from_env(&crate::config::FakeEnv::default());
    MovementProfiles::from_config(&config.navigation)
}

#[tokio::test]
async fn active_client_is_none_before_start() {
    let supervisor = LifecycleSupervisor::new(
        FakeGameClientFactory,
        connect_options(),
        Duration::from_millis(50),
        profiles(),
        CancellationToken::new(),
    );
    assert!(supervisor.active_client().await.is_none());
}

#[tokio::test]
async fn active_client_present_after_start() {
    let supervisor = LifecycleSupervisor::new(
        FakeGameClientFactory,
        connect_options(),
        Duration::from_millis(50),
        profiles(),
        CancellationToken::new(),
    );
    supervisor.start().await;
    assert!(supervisor.active_client().await.is_some());
}

#[tokio::test(start_paused = true)]
async fn connection_loss_reconnects_after_delay() {
    let supervisor = LifecycleSupervisor::new(
        FakeGameClientFactory,
        connect_options(),
        Duration::from_millis(100),
        profiles(),
        CancellationToken::new(),
    );
    supervisor.start().await;
    supervisor.notify_connection_lost("kicked").await;
    assert!(supervisor.active_client().await.is_none());

    tokio::time::advance(Duration::from_millis(150)).await;
    tokio::task::yield_now().await;
    assert!(supervisor.active_client().await.is_some());
}

#[tokio::test]
async fn role_update_normalises_unknown_to_generalist() {
    let supervisor = LifecycleSupervisor::new(
        FakeGameClientFactory,
        connect_options(),
        Duration::from_millis(50),
        profiles(),
        CancellationToken::new(),
    );
    let role = AgentRole::parse("paladin");
    let state = supervisor.apply_role_update(role).await;
    assert_eq!(state.role, AgentRole::Generalist);
    assert_eq!(state.last_event_id, 1);
}

#[tokio::test]
async fn repeated_role_update_bumps_event_id_each_time() {
    let supervisor = LifecycleSupervisor::new(
        FakeGameClientFactory,
        connect_options(),
        Duration::from_millis(50),
        profiles(),
        CancellationToken::new(),
    );
    let first = supervisor.apply_role_update(AgentRole::Scout).await;
    let second = supervisor.apply_role_update(AgentRole::Scout).await;
    assert_eq!(first.role, second.role);
    assert_ne!(first.last_event_id, second.last_event_id);
}

#[test]
fn forced_move_tracker_does_not_relog_within_one_second() {
    let tracker = ForcedMoveTracker::default();
    tracker.record(1_000);
    tracker.record(1_500);
    assert_eq!(tracker.last_recorded_ms(), 1_500);
}
