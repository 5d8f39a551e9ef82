// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External collaborator boundary (spec §1, §6): the game-protocol client and
//! the path-finding library are excluded from this core's implementation.
//! Everything this core needs from them is expressed as a trait so the
//! Lifecycle Supervisor, Navigation Controller, Perception Sampler, and
//! Action Playback Engine can be built and tested without a concrete
//! Minecraft-protocol implementation.

use std::time::Duration;

/// World-space position. Game coordinates are floating point; "floored"
/// positions used in snapshots and hazard scans are derived from these.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn floor(self) -> (i64, i64, i64) {
        (self.x.floor() as i64, self.y.floor() as i64, self.z.floor() as i64)
    }

    pub fn distance_to(self, other: Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2)).sqrt()
    }
}

/// Credentials and connection target for the game server (spec §6).
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub auth_mode: crate::config::AuthMode,
    pub version: Option<String>,
}

/// A single path-finding goal. `Goal::Near` is the only variant this core
/// constructs (spec §9 Open Questions decision 2); `GoalBlock` is not
/// modelled.
#[derive(Debug, Clone, Copy)]
pub enum Goal {
    Near { x: f64, y: f64, z: f64, tolerance: u32 },
}

/// Immutable, spawn-time-computed movement configuration (spec §4.5). Two
/// instances exist for the lifetime of a client: cautious and dig-permissive.
#[derive(Debug, Clone, Copy)]
pub struct MovementProfile {
    pub can_dig: bool,
    pub dig_cost: u32,
    pub allow_parkour: bool,
    pub allow_sprinting: bool,
}

/// Failure reported by [`Pathfinder::goto`]. `NoPath` lets implementors that
/// can classify the failure report it directly; `Other` carries a message
/// that navigation falls back to classifying by substring (spec §9 decision
/// 3, `PathfindError::looks_like_no_path`).
#[derive(Debug, Clone, PartialEq)]
pub enum PathfindError {
    NoPath,
    GoalChanged,
    Other(String),
}

impl PathfindError {
    /// Case-insensitive fallback classifier for implementors that can only
    /// surface a message string, per spec §9 decision 3.
    pub fn looks_like_no_path(message: &str) -> bool {
        message.to_ascii_lowercase().contains("no path")
    }

    pub fn looks_like_goal_changed(message: &str) -> bool {
        let lower = message.to_ascii_lowercase();
        lower.contains("goal") && lower.contains("change")
    }
}

/// The eight compass bearings used in perception summaries (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Bearing {
    N,
    Ne,
    E,
    Se,
    S,
    Sw,
    W,
    Nw,
}

impl Bearing {
    /// `atan2(-dx, dz)` bucketed into 8 compass sectors of 45 degrees each.
    pub fn from_offset(dx: f64, dz: f64) -> Bearing {
        let angle = (-dx).atan2(dz).to_degrees();
        let normalised = (angle + 360.0) % 360.0;
        let sector = ((normalised + 22.5) / 45.0).floor() as i64 % 8;
        match sector {
            0 => Bearing::N,
            1 => Bearing::Ne,
            2 => Bearing::E,
            3 => Bearing::Se,
            4 => Bearing::S,
            5 => Bearing::Sw,
            6 => Bearing::W,
            _ => Bearing::Nw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Player,
    Hostile,
    Passive,
    Other,
}

#[derive(Debug, Clone)]
pub struct EntitySnapshot {
    pub name: String,
    pub kind: EntityKind,
    pub position: Position,
}

#[derive(Debug, Clone)]
pub struct BlockInfo {
    pub name: String,
    pub is_liquid: bool,
    pub is_empty: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct LightLevels {
    pub sky: u8,
    pub block: u8,
}

#[derive(Debug, Clone, Copy)]
pub struct WeatherState {
    pub is_raining: bool,
    pub rain_level: f64,
    pub thunder_level: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct TimeState {
    pub age: u64,
    pub day: u64,
    pub time_of_day: u64,
}

#[derive(Debug, Clone)]
pub struct InventorySlot {
    pub slot: usize,
    pub name: String,
    pub display_name: String,
    pub count: u32,
    pub enchantments: Vec<String>,
    pub durability: Option<(u32, u32)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    Survival,
    Creative,
    Adventure,
    Spectator,
}

/// Control inputs driven by the Action Playback Engine (spec §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKey {
    Forward,
    Back,
    Left,
    Right,
    Jump,
    Sprint,
    Sneak,
    Attack,
    Use,
}

/// The game-protocol client this core drives. A concrete implementation
/// wraps the real wire protocol; this trait is the entire surface the
/// Runtime Core depends on.
#[allow(async_fn_in_trait)]
pub trait GameClient: Send + Sync {
    fn position(&self) -> Option<Position>;
    fn velocity(&self) -> Option<Position>;
    fn yaw_pitch(&self) -> Option<(f64, f64)>;
    fn on_ground(&self) -> bool;
    fn dimension(&self) -> String;
    fn health(&self) -> Option<f64>;
    fn food_level(&self) -> Option<f64>;
    fn saturation(&self) -> Option<f64>;
    fn oxygen(&self) -> Option<f64>;
    fn game_mode(&self) -> GameMode;
    fn weather(&self) -> WeatherState;
    fn time(&self) -> TimeState;
    fn light_at(&self, x: i64, y: i64, z: i64) -> Option<LightLevels>;
    fn block_at(&self, x: i64, y: i64, z: i64) -> Option<BlockInfo>;
    fn nearby_entities(&self, radius: u32) -> Vec<EntitySnapshot>;
    fn inventory(&self) -> Vec<InventorySlot>;
    fn held_item(&self) -> Option<String>;

    /// Whether the server has forced a pathfinding goal change since this
    /// was last observed (spec §4.5 "forced-move recording"). Polled once
    /// per status tick; implementations without a way to detect this can
    /// rely on the default, which never reports one.
    fn forced_move_pending(&self) -> bool {
        false
    }

    async fn goto(&self, goal: Goal, profile: MovementProfile) -> Result<(), PathfindError>;
    async fn stop_pathfinding(&self);
    async fn set_control_state(&self, control: ControlKey, state: bool);
    async fn clear_control_states(&self);
    async fn look_at(&self, yaw: f64, pitch: f64);
    async fn chat(&self, text: &str);
    async fn equip(&self, item_name: &str) -> Result<(), String>;
    async fn consume_held_item(&self) -> Result<(), String>;
}

/// Constructs a [`GameClient`] for a connection target. Excluded from this
/// core's implementation (spec §1); concrete adapters live outside this
/// crate.
#[allow(async_fn_in_trait)]
pub trait GameClientFactory: Send + Sync {
    type Client: GameClient;

    async fn connect(&self, options: &ConnectOptions) -> Result<Self::Client, String>;
}

pub fn default_forced_move_retry_window() -> Duration {
    Duration::from_secs(1)
}
