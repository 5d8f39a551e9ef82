// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::game_client::Position;
use crate::testutil::{connect_options, FakeGameClientFactory};

fn nav_config() -> NavigationConfig {
    let (config, _) = crate::config::Config::from_env(&crate::config::FakeEnv::default());
    config.navigation
}

async fn controller_with(
    goto_results: Vec<Result<(), PathfindError>>,
) -> NavigationController<FakeGameClientFactory> {
    let lifecycle = LifecycleSupervisor::new(
        FakeGameClientFactory,
        connect_options(),
        Duration::from_millis(50),
        MovementProfiles::from_config(&nav_config()),
        tokio_util::sync::CancellationToken::new(),
    );
    lifecycle.start().await;
    if let Some(client) = lifecycle.active_client().await {
        client.state.lock().expect("lock poisoned").position = Some(Position { x: 0.0, y: 64.0, z: 0.0 });
        client.state.lock().expect("lock poisoned").goto_results = goto_results;
    }
    NavigationController::new(lifecycle, &nav_config())
}

#[tokio::test]
async fn invalid_coordinates_rejected_without_touching_client() {
    let controller = controller_with(vec![]).await;
    let err = controller.move_to(f64::NAN, 64.0, 0.0).await.unwrap_err();
    assert_eq!(err, BotError::InvalidCoordinates);
    assert!(controller.last_move_target().await.is_none());
}

#[tokio::test]
async fn disconnected_move_returns_not_connected() {
    let lifecycle = LifecycleSupervisor::new(
        FakeGameClientFactory,
        connect_options(),
        Duration::from_millis(50),
        MovementProfiles::from_config(&nav_config()),
        tokio_util::sync::CancellationToken::new(),
    );
    let controller = NavigationController::new(lifecycle, &nav_config());
    let err = controller.move_to(10.0, 64.0, 10.0).await.unwrap_err();
    assert_eq!(err, BotError::NotConnected);
}

#[tokio::test]
async fn successful_goto_returns_ok() {
    let controller = controller_with(vec![Ok(())]).await;
    controller.move_to(10.0, 64.0, 10.0).await.unwrap();
    assert_eq!(controller.last_move_target().await, Some((10.0, 64.0, 10.0)));
}

#[tokio::test(start_paused = true)]
async fn no_path_retries_with_dig_permissive_profile_then_succeeds() {
    let controller = controller_with(vec![
        Err(PathfindError::Other("no path found".to_owned())),
        Ok(()),
    ])
    .await;
    controller.move_to(10.0, 64.0, 10.0).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn exhausted_no_path_fallback_surfaces_pathfinding_failed() {
    let controller = controller_with(vec![
        Err(PathfindError::Other("no path found".to_owned())),
        Err(PathfindError::Other("no path found".to_owned())),
    ])
    .await;
    let err = controller.move_to(10.0, 64.0, 10.0).await.unwrap_err();
    assert_eq!(err, BotError::PathfindingFailed);
}

#[tokio::test(start_paused = true)]
async fn forced_move_within_retry_window_retries_goal_changed_then_succeeds() {
    let controller = controller_with(vec![Err(PathfindError::GoalChanged), Ok(())]).await;
    controller.record_forced_move();
    controller.move_to(10.0, 64.0, 10.0).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn goal_changed_without_a_recent_forced_move_is_not_retried() {
    let controller = controller_with(vec![Err(PathfindError::GoalChanged)]).await;
    let err = controller.move_to(10.0, 64.0, 10.0).await.unwrap_err();
    assert_eq!(err, BotError::PathfindingFailed);
}

#[test]
fn vertical_gap_exactly_two_does_not_tighten_tolerance() {
    let config = nav_config();
    let lifecycle_tolerance = config.move_goal_tolerance;
    let controller = NavigationControllerToleranceProbe { move_goal_tolerance: lifecycle_tolerance };
    assert_eq!(controller.resolve(2.0), lifecycle_tolerance);
    assert_eq!(controller.resolve(2.1), 1);
}

struct NavigationControllerToleranceProbe {
    move_goal_tolerance: u32,
}

impl NavigationControllerToleranceProbe {
    fn resolve(&self, vertical_gap: f64) -> u32 {
        if vertical_gap > 2.0 {
            1u32.max(self.move_goal_tolerance.min(1))
        } else {
            self.move_goal_tolerance
        }
    }
}
