// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin process entry point (spec §4.11): hands off to [`botrelay::run`].
//!
//! `GameClient` is an excluded external collaborator (spec §1) — this core
//! never implements the low-level game-protocol client. A real deployment
//! links a crate that implements [`botrelay::game_client::GameClientFactory`]
//! against the actual protocol and passes it here instead of
//! [`UnlinkedGameClientFactory`]. Until that adapter is wired in, the
//! supervisor's ordinary reconnect/backoff path (spec §4.4, never fatal)
//! simply keeps retrying and logging, rather than the process refusing to
//! start.

use botrelay::game_client::{ConnectOptions, GameClientFactory};

/// Placeholder [`GameClientFactory`] used when no concrete game-protocol
/// adapter has been linked into the binary. Every connect attempt fails,
/// which the Lifecycle Supervisor treats as an ordinary transient-transport
/// failure (spec §7) and retries after the configured reconnect delay.
struct UnlinkedGameClientFactory;

struct UnlinkedGameClient;

impl botrelay::game_client::GameClient for UnlinkedGameClient {
    fn position(&self) -> Option<botrelay::game_client::Position> {
        None
    }
    fn velocity(&self) -> Option<botrelay::game_client::Position> {
        None
    }
    fn yaw_pitch(&self) -> Option<(f64, f64)> {
        None
    }
    fn on_ground(&self) -> bool {
        false
    }
    fn dimension(&self) -> String {
        String::new()
    }
    fn health(&self) -> Option<f64> {
        None
    }
    fn food_level(&self) -> Option<f64> {
        None
    }
    fn saturation(&self) -> Option<f64> {
        None
    }
    fn oxygen(&self) -> Option<f64> {
        None
    }
    fn game_mode(&self) -> botrelay::game_client::GameMode {
        botrelay::game_client::GameMode::Survival
    }
    fn weather(&self) -> botrelay::game_client::WeatherState {
        botrelay::game_client::WeatherState { is_raining: false, rain_level: 0.0, thunder_level: 0.0 }
    }
    fn time(&self) -> botrelay::game_client::TimeState {
        botrelay::game_client::TimeState { age: 0, day: 0, time_of_day: 0 }
    }
    fn light_at(&self, _x: i64, _y: i64, _z: i64) -> Option<botrelay::game_client::LightLevels> {
        None
    }
    fn block_at(&self, _x: i64, _y: i64, _z: i64) -> Option<botrelay::game_client::BlockInfo> {
        None
    }
    fn nearby_entities(&self, _radius: u32) -> Vec<botrelay::game_client::EntitySnapshot> {
        Vec::new()
    }
    fn inventory(&self) -> Vec<botrelay::game_client::InventorySlot> {
        Vec::new()
    }
    fn held_item(&self) -> Option<String> {
        None
    }
    async fn goto(
        &self,
        _goal: botrelay::game_client::Goal,
        _profile: botrelay::game_client::MovementProfile,
    ) -> Result<(), botrelay::game_client::PathfindError> {
        Err(botrelay::game_client::PathfindError::Other("no game client adapter linked".to_owned()))
    }
    async fn stop_pathfinding(&self) {}
    async fn set_control_state(&self, _control: botrelay::game_client::ControlKey, _state: bool) {}
    async fn clear_control_states(&self) {}
    async fn look_at(&self, _yaw: f64, _pitch: f64) {}
    async fn chat(&self, _text: &str) {}
    async fn equip(&self, _item_name: &str) -> Result<(), String> {
        Err("no game client adapter linked".to_owned())
    }
    async fn consume_held_item(&self) -> Result<(), String> {
        Err("no game client adapter linked".to_owned())
    }
}

impl GameClientFactory for UnlinkedGameClientFactory {
    type Client = UnlinkedGameClient;

    async fn connect(&self, _options: &ConnectOptions) -> Result<Self::Client, String> {
        Err("no game client adapter linked into this binary".to_owned())
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = botrelay::run(UnlinkedGameClientFactory).await {
        eprintln!("botrelayd failed to start: {err}");
        std::process::exit(1);
    }
}
