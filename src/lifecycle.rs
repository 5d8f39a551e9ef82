// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle Supervisor (spec §4.4): owns at most one game-client instance,
//! reconnects it after loss, and owns per-agent role state. Modelled after
//! the teacher's health-checker shape (snapshot-then-iterate, idempotent
//! reconnect scheduling) applied to a single owned client instead of many
//! upstream sessions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::clock::{unix_millis, Clock};
use crate::envelope::AgentRole;
use crate::game_client::{ConnectOptions, GameClient, GameClientFactory, MovementProfile};

/// The two immutable movement profiles computed once at spawn (spec §4.5,
/// Design Notes "profile-typed movement").
#[derive(Debug, Clone, Copy)]
pub struct MovementProfiles {
    pub cautious: MovementProfile,
    pub dig_permissive: MovementProfile,
}

impl MovementProfiles {
    pub fn from_config(nav: &crate::config::NavigationConfig) -> Self {
        Self {
            cautious: MovementProfile {
                can_dig: false,
                dig_cost: nav.dig_cost_enabled.max(nav.dig_cost_disabled),
                allow_parkour: nav.allow_parkour,
                allow_sprinting: nav.allow_sprinting,
            },
            dig_permissive: MovementProfile {
                can_dig: true,
                dig_cost: nav.dig_cost_enabled,
                allow_parkour: nav.allow_parkour,
                allow_sprinting: nav.allow_sprinting,
            },
        }
    }
}

/// Role descriptor tracked per controlled agent (spec §3, §4.4).
#[derive(Debug, Clone)]
pub struct RoleState {
    pub role: AgentRole,
    pub last_event_id: u64,
    pub last_updated_at: u64,
}

impl Default for RoleState {
    fn default() -> Self {
        Self { role: AgentRole::Generalist, last_event_id: 0, last_updated_at: unix_millis() }
    }
}

struct Inner<C: GameClient> {
    client: Option<Arc<C>>,
    spawned: bool,
    role: RoleState,
    reconnect_scheduled: bool,
}

/// Owns the single game-client instance and reconnects it after loss.
/// Generic over the concrete `GameClient` implementation so tests can
/// substitute a fake one.
pub struct LifecycleSupervisor<F: GameClientFactory> {
    factory: F,
    options: ConnectOptions,
    reconnect_delay: Duration,
    profiles: MovementProfiles,
    inner: RwLock<Inner<F::Client>>,
    cancel: CancellationToken,
}

impl<F: GameClientFactory + 'static> LifecycleSupervisor<F> {
    pub fn new(
        factory: F,
        options: ConnectOptions,
        reconnect_delay: Duration,
        profiles: MovementProfiles,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            factory,
            options,
            reconnect_delay,
            profiles,
            inner: RwLock::new(Inner {
                client: None,
                spawned: false,
                role: RoleState::default(),
                reconnect_scheduled: false,
            }),
            cancel,
        })
    }

    pub fn profiles(&self) -> MovementProfiles {
        self.profiles
    }

    /// Connects the client for the first time. Subsequent reconnects are
    /// driven by [`Self::notify_connection_lost`].
    pub async fn start(self: &Arc<Self>) {
        self.connect_once().await;
    }

    async fn connect_once(self: &Arc<Self>) {
        match self.factory.connect(&self.options).await {
            Ok(client) => {
                info!(host = %self.options.host, port = self.options.port, "game client connected");
                let mut guard = self.inner.write().await;
                guard.client = Some(Arc::new(client));
                guard.spawned = true;
                guard.reconnect_scheduled = false;
            }
            Err(err) => {
                warn!(error = %err, "game client connect failed, scheduling retry");
                self.schedule_reconnect();
            }
        }
    }

    /// Returns the active client only if one exists and has completed spawn
    /// (spec §4.4 `getActiveClient`). `None` means "not ready".
    pub async fn active_client(&self) -> Option<Arc<F::Client>> {
        let guard = self.inner.read().await;
        if guard.spawned {
            guard.client.clone()
        } else {
            None
        }
    }

    /// Called on `connection_error | kicked | ended` (spec §4.4). Drops the
    /// instance and schedules a reconnect; idempotent.
    pub async fn notify_connection_lost(self: &Arc<Self>, reason: &str) {
        {
            let mut guard = self.inner.write().await;
            guard.client = None;
            guard.spawned = false;
        }
        warn!(reason, "game client connection lost");
        self.schedule_reconnect();
    }

    fn schedule_reconnect(self: &Arc<Self>) {
        let already = {
            let inner = self.inner.try_read();
            inner.map(|g| g.reconnect_scheduled).unwrap_or(false)
        };
        if already {
            return;
        }
        let this = Arc::clone(self);
        let delay = self.reconnect_delay;
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            {
                let mut guard = this.inner.write().await;
                if guard.reconnect_scheduled {
                    return;
                }
                guard.reconnect_scheduled = true;
            }
            let clock = Clock;
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = clock.sleep(delay) => {
                    this.connect_once().await;
                }
            }
        });
    }

    /// Normalises `id`, updates the current role, and stamps a fresh event
    /// id and timestamp (spec §4.4). Unknown role strings fall back to
    /// `generalist` (handled by [`AgentRole::parse`] upstream).
    pub async fn apply_role_update(&self, role: AgentRole) -> RoleState {
        let mut guard = self.inner.write().await;
        guard.role.role = role;
        guard.role.last_event_id += 1;
        guard.role.last_updated_at = unix_millis();
        guard.role.clone()
    }

    pub async fn current_role(&self) -> RoleState {
        self.inner.read().await.role.clone()
    }
}

/// Forced-move correction tracking, rate-limited to at most one log per
/// second (spec §4.5 "forced-move recording").
pub struct ForcedMoveTracker {
    last_recorded_ms: std::sync::atomic::AtomicU64,
    logged_recently: AtomicBool,
}

impl Default for ForcedMoveTracker {
    fn default() -> Self {
        Self { last_recorded_ms: std::sync::atomic::AtomicU64::new(0), logged_recently: AtomicBool::new(false) }
    }
}

impl ForcedMoveTracker {
    /// Records a forced-move correction at `now_ms`, returning its timestamp.
    /// Repeated recordings within 1s do not re-log.
    pub fn record(&self, now_ms: u64) -> u64 {
        let last = self.last_recorded_ms.swap(now_ms, Ordering::SeqCst);
        if now_ms.saturating_sub(last) > 1000 {
            self.logged_recently.store(false, Ordering::SeqCst);
        }
        if !self.logged_recently.swap(true, Ordering::SeqCst) {
            info!(at = now_ms, "forced move correction recorded");
        }
        now_ms
    }

    pub fn last_recorded_ms(&self) -> u64 {
        self.last_recorded_ms.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
