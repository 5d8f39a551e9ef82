// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Navigation Controller (spec §4.5): resolves tolerance, builds a
//! goal-near, and retries across the cautious/dig-permissive movement
//! profiles on forced-move corrections and no-path failures.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::clock::{unix_millis, Clock};
use crate::config::NavigationConfig;
use crate::error::BotError;
use crate::game_client::{Goal, GameClientFactory, MovementProfile, PathfindError};
use crate::lifecycle::{ForcedMoveTracker, LifecycleSupervisor, MovementProfiles};

pub struct NavigationController<F: GameClientFactory> {
    lifecycle: Arc<LifecycleSupervisor<F>>,
    move_goal_tolerance: u32,
    forced_move_retry_window: Duration,
    forced_move_max_retries: u32,
    forced_move_retry_delay: Duration,
    forced_move: ForcedMoveTracker,
    last_move_target: RwLock<Option<(f64, f64, f64)>>,
}

impl<F: GameClientFactory> NavigationController<F> {
    pub fn new(lifecycle: Arc<LifecycleSupervisor<F>>, config: &NavigationConfig) -> Self {
        Self {
            lifecycle,
            move_goal_tolerance: config.move_goal_tolerance,
            forced_move_retry_window: config.forced_move_retry_window,
            forced_move_max_retries: config.forced_move_max_retries,
            forced_move_retry_delay: config.forced_move_retry_delay,
            forced_move: ForcedMoveTracker::default(),
            last_move_target: RwLock::new(None),
        }
    }

    pub async fn last_move_target(&self) -> Option<(f64, f64, f64)> {
        *self.last_move_target.read().await
    }

    /// Called by the Lifecycle Supervisor's event plumbing when the server
    /// reports a forced-move correction (spec §4.5 "forced-move recording").
    pub fn record_forced_move(&self) -> u64 {
        self.forced_move.record(unix_millis())
    }

    fn resolve_tolerance(&self, vertical_gap: f64) -> u32 {
        if vertical_gap > 2.0 {
            1u32.max(self.move_goal_tolerance.min(1))
        } else {
            self.move_goal_tolerance
        }
    }

    pub async fn move_to(&self, x: f64, y: f64, z: f64) -> Result<(), BotError> {
        if !x.is_finite() || !y.is_finite() || !z.is_finite() {
            return Err(BotError::InvalidCoordinates);
        }

        let client = self.lifecycle.active_client().await.ok_or(BotError::NotConnected)?;
        *self.last_move_target.write().await = Some((x, y, z));

        let current_y = client.position().map(|p| p.y).unwrap_or(y);
        let tolerance = self.resolve_tolerance((current_y - y).abs());
        let goal = Goal::Near { x, y, z, tolerance };

        let profiles = self.lifecycle.profiles();
        let mut profile = profiles.cautious;
        let mut attempts = 0u32;
        let mut used_fallback = false;

        loop {
            match client.goto(goal, profile).await {
                Ok(()) => {
                    info!(x, y, z, tolerance, "move_to succeeded");
                    return Ok(());
                }
                Err(err) => {
                    let message = match &err {
                        PathfindError::Other(m) => m.clone(),
                        PathfindError::NoPath => "no path".to_owned(),
                        PathfindError::GoalChanged => "goal changed".to_owned(),
                    };

                    let is_goal_changed = matches!(err, PathfindError::GoalChanged)
                        || PathfindError::looks_like_goal_changed(&message);
                    let within_retry_window =
                        unix_millis().saturating_sub(self.forced_move.last_recorded_ms()) <= self.forced_move_retry_window.as_millis() as u64;

                    if is_goal_changed && within_retry_window && attempts < self.forced_move_max_retries {
                        attempts += 1;
                        warn!(attempts, "forced-move correction, retrying");
                        Clock.sleep(self.forced_move_retry_delay).await;
                        continue;
                    }

                    let is_no_path = matches!(err, PathfindError::NoPath) || PathfindError::looks_like_no_path(&message);
                    if is_no_path && !used_fallback {
                        used_fallback = true;
                        profile = self.dig_permissive_profile(profile, profiles);
                        warn!("no path with cautious profile, retrying with dig-permissive profile");
                        continue;
                    }

                    warn!(error = %message, "pathfinding failed");
                    return Err(BotError::PathfindingFailed);
                }
            }
        }
    }

    fn dig_permissive_profile(&self, current: MovementProfile, profiles: MovementProfiles) -> MovementProfile {
        if current.can_dig {
            current
        } else {
            profiles.dig_permissive
        }
    }
}

#[cfg(test)]
#[path = "navigation_tests.rs"]
mod tests;
