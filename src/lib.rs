// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime core of an automated game-agent adapter (spec §1): a Command
//! Router, an Agent Event Bridge, a Lifecycle Supervisor, a Navigation
//! Controller, a Perception Sampler, and an Action Playback Engine, sitting
//! on a shared Config Resolver / Telemetry Context / process harness.

pub mod bridge;
pub mod clock;
pub mod config;
pub mod envelope;
pub mod error;
pub mod game_client;
pub mod handlers;
pub mod lifecycle;
pub mod navigation;
pub mod perception;
pub mod playback;
pub mod router;
pub mod skills;
pub mod state;
pub mod sustainability;
pub mod telemetry;
pub mod transport;

#[cfg(test)]
mod testutil;

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, ProcessEnv};
use crate::envelope::{AgentEvent, AgentEventKind};
use crate::game_client::{ConnectOptions, GameClient, GameClientFactory};
use crate::state::AppState;

/// Stand-in food dictionary (spec §4.8: "populated from game-data on spawn").
/// This core has no game-data source of its own (the game-protocol client is
/// an excluded external collaborator, spec §1), so [`run`] seeds the
/// Sustainability Service with this static list instead.
pub const DEFAULT_FOOD_NAMES: &[&str] = &[
    "bread",
    "cooked_beef",
    "cooked_porkchop",
    "cooked_chicken",
    "cooked_mutton",
    "cooked_rabbit",
    "cooked_cod",
    "cooked_salmon",
    "baked_potato",
    "apple",
    "carrot",
    "melon_slice",
];

/// Cadence of the status poller that stands in for the game-client's event
/// stream (spec §4.4/§4.6/§4.8 are all specified against individual game
/// events; the `GameClient` trait boundary in this core does not expose an
/// event subscription, so position/perception broadcasts and the
/// sustainability check are instead driven by this poll loop).
const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Runs the process until `SIGTERM`/`SIGINT` (spec §4.11 "Process Harness").
/// `main()` is the only caller; everything here is otherwise reachable and
/// unit-testable without going through it.
pub async fn run<F: GameClientFactory + 'static>(factory: F) -> anyhow::Result<()> {
    let (config, warnings) = Config::from_env(&ProcessEnv);
    let (instruments, telemetry_guard) = telemetry::install(&config.telemetry);

    for warning in &warnings {
        tracing::warn!(key = warning.key, message = %warning.message, "config warning");
    }

    let cancel = CancellationToken::new();
    let connect_options = ConnectOptions {
        host: config.game_server.host.clone(),
        port: config.game_server.port,
        username: config.game_server.username.clone(),
        auth_mode: config.game_server.auth_mode,
        version: config.game_server.version.clone(),
    };
    let food_names = DEFAULT_FOOD_NAMES.iter().map(|s| s.to_string()).collect();
    let router_config = config.router.clone();
    let agent_id = config.game_server.username.clone();

    let state = AppState::new(config, instruments, factory, connect_options, food_names, cancel.clone());

    state.lifecycle.start().await;
    state.bridge.start();
    spawn_status_poller(state.clone(), agent_id);

    let addr = format!("{}:{}", router_config.host, router_config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "command router listening");

    let shutdown_cancel = cancel.clone();
    tokio::spawn(async move {
        await_shutdown_signal().await;
        shutdown_cancel.cancel();
    });

    let app_router = router::build_router(state.clone());
    let serve_cancel = cancel.clone();
    axum::serve(listener, app_router).with_graceful_shutdown(async move { serve_cancel.cancelled().await }).await?;

    telemetry_guard.shutdown();
    Ok(())
}

async fn await_shutdown_signal() {
    let ctrl_c = async { tokio::signal::ctrl_c().await.ok() };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => tracing::warn!(error = %err, "failed to install SIGTERM handler"),
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Periodically drives position/perception broadcasts and the sustainability
/// check against the active game client (see [`STATUS_POLL_INTERVAL`]).
fn spawn_status_poller<F: GameClientFactory + 'static>(state: Arc<AppState<F>>, agent_id: String) {
    tokio::spawn(async move {
        let clock = clock::Clock;
        let mut tick = clock.interval(STATUS_POLL_INTERVAL);
        loop {
            tokio::select! {
                _ = state.cancel.cancelled() => break,
                _ = tick.tick() => poll_once(&state, &agent_id).await,
            }
        }
    });
}

async fn poll_once<F: GameClientFactory + 'static>(state: &Arc<AppState<F>>, agent_id: &str) {
    let Some(client) = state.lifecycle.active_client().await else { return };

    state.sustainability.on_health_event(&*client).await;

    if client.forced_move_pending() {
        state.navigation.record_forced_move();
    }

    if let Some(position) = client.position() {
        if let Some(payload) = state.perception.maybe_broadcast_position(position).await {
            state.bridge.enqueue(AgentEvent::new(AgentEventKind::Position, agent_id, clock::unix_millis(), payload)).await;
        }
    }

    if let Some(payload) = state.perception.maybe_broadcast_perception(&*client, false).await {
        state.bridge.enqueue(AgentEvent::new(AgentEventKind::Perception, agent_id, clock::unix_millis(), payload)).await;
    }
}
