// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fakes shared across unit tests for components built on [`GameClient`].
//! Not part of the public API; compiled only under `cfg(test)`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::game_client::{
    BlockInfo, ConnectOptions, EntitySnapshot, GameClient, GameClientFactory, GameMode, Goal,
    InventorySlot, LightLevels, PathfindError, Position, TimeState, WeatherState,
};

#[derive(Default)]
pub struct FakeGameClientState {
    pub position: Option<Position>,
    pub velocity: Option<Position>,
    pub yaw_pitch: Option<(f64, f64)>,
    pub on_ground: bool,
    pub dimension: String,
    pub health: Option<f64>,
    pub food_level: Option<f64>,
    pub saturation: Option<f64>,
    pub oxygen: Option<f64>,
    pub game_mode: Option<GameMode>,
    pub entities: Vec<EntitySnapshot>,
    pub inventory: Vec<InventorySlot>,
    pub held_item: Option<String>,
    pub goto_results: Vec<Result<(), PathfindError>>,
    pub goto_calls: Vec<Goal>,
    pub chats: Vec<String>,
    pub controls: Vec<(crate::game_client::ControlKey, bool)>,
    pub forced_move_pending: bool,
}

pub struct FakeGameClient {
    pub state: Mutex<FakeGameClientState>,
    pub goto_index: AtomicUsize,
}

impl FakeGameClient {
    pub fn new(state: FakeGameClientState) -> Self {
        Self { state: Mutex::new(state), goto_index: AtomicUsize::new(0) }
    }
}

impl GameClient for FakeGameClient {
    fn position(&self) -> Option<Position> {
        self.state.lock().expect("lock poisoned").position
    }

    fn velocity(&self) -> Option<Position> {
        self.state.lock().expect("lock poisoned").velocity
    }

    fn yaw_pitch(&self) -> Option<(f64, f64)> {
        self.state.lock().expect("lock poisoned").yaw_pitch
    }

    fn on_ground(&self) -> bool {
        self.state.lock().expect("lock poisoned").on_ground
    }

    fn dimension(&self) -> String {
        self.state.lock().expect("lock poisoned").dimension.clone()
    }

    fn health(&self) -> Option<f64> {
        self.state.lock().expect("lock poisoned").health
    }

    fn food_level(&self) -> Option<f64> {
        self.state.lock().expect("lock poisoned").food_level
    }

    fn saturation(&self) -> Option<f64> {
        self.state.lock().expect("lock poisoned").saturation
    }

    fn oxygen(&self) -> Option<f64> {
        self.state.lock().expect("lock poisoned").oxygen
    }

    fn game_mode(&self) -> GameMode {
        self.state.lock().expect("lock poisoned").game_mode.unwrap_or(GameMode::Survival)
    }

    fn weather(&self) -> WeatherState {
        WeatherState { is_raining: false, rain_level: 0.0, thunder_level: 0.0 }
    }

    fn time(&self) -> TimeState {
        TimeState { age: 0, day: 0, time_of_day: 0 }
    }

    fn light_at(&self, _x: i64, _y: i64, _z: i64) -> Option<LightLevels> {
        Some(LightLevels { sky: 15, block: 15 })
    }

    fn block_at(&self, _x: i64, _y: i64, _z: i64) -> Option<BlockInfo> {
        Some(BlockInfo { name: "air".to_owned(), is_liquid: false, is_empty: true })
    }

    fn nearby_entities(&self, _radius: u32) -> Vec<EntitySnapshot> {
        self.state.lock().expect("lock poisoned").entities.clone()
    }

    fn inventory(&self) -> Vec<InventorySlot> {
        self.state.lock().expect("lock poisoned").inventory.clone()
    }

    fn held_item(&self) -> Option<String> {
        self.state.lock().expect("lock poisoned").held_item.clone()
    }

    fn forced_move_pending(&self) -> bool {
        self.state.lock().expect("lock poisoned").forced_move_pending
    }

    async fn goto(&self, goal: Goal, _profile: crate::game_client::MovementProfile) -> Result<(), PathfindError> {
        let mut state = self.state.lock().expect("lock poisoned");
        state.goto_calls.push(goal);
        let idx = self.goto_index.fetch_add(1, Ordering::SeqCst);
        state.goto_results.get(idx).cloned().unwrap_or(Ok(()))
    }

    async fn stop_pathfinding(&self) {}

    async fn set_control_state(&self, control: crate::game_client::ControlKey, state: bool) {
        self.state.lock().expect("lock poisoned").controls.push((control, state));
    }

    async fn clear_control_states(&self) {}

    async fn look_at(&self, yaw: f64, pitch: f64) {
        self.state.lock().expect("lock poisoned").yaw_pitch = Some((yaw, pitch));
    }

    async fn chat(&self, text: &str) {
        self.state.lock().expect("lock poisoned").chats.push(text.to_owned());
    }

    async fn equip(&self, _item_name: &str) -> Result<(), String> {
        Ok(())
    }

    async fn consume_held_item(&self) -> Result<(), String> {
        Ok(())
    }
}

pub struct FakeGameClientFactory;

impl GameClientFactory for FakeGameClientFactory {
    type Client = FakeGameClient;

    async fn connect(&self, _options: &ConnectOptions) -> Result<Self::Client, String> {
        Ok(FakeGameClient::new(FakeGameClientState { dimension: "overworld".to_owned(), ..Default::default() }))
    }
}

pub fn connect_options() -> ConnectOptions {
    ConnectOptions {
        host: "localhost".to_owned(),
        port: 25565,
        username: "agent".to_owned(),
        auth_mode: crate::config::AuthMode::Offline,
        version: None,
    }
}
