// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::game_client::{EntitySnapshot, GameMode, Position};
use crate::testutil::FakeGameClient;

fn sampler_with(interval_ms: u64) -> PerceptionSampler {
    let config = PerceptionConfig {
        entity_radius: 12,
        block_radius: 4,
        block_height: 2,
        broadcast_interval: Duration::from_millis(interval_ms),
    };
    let meter = opentelemetry::global::meter("test");
    PerceptionSampler::new(
        config,
        Instruments {
            snapshot_build_duration: meter.f64_histogram("t1").build(),
            errors_total: meter.u64_counter("t2").build(),
            agent_events_sent_total: meter.u64_counter("t3").build(),
            queue_evictions_total: meter.u64_counter("t4").build(),
            queue_depth: meter.i64_up_down_counter("t5").build(),
        },
    )
}

fn client_at(x: f64, y: f64, z: f64) -> FakeGameClient {
    let mut state = crate::testutil::FakeGameClientState { dimension: "overworld".to_owned(), ..Default::default() };
    state.position = Some(Position { x, y, z });
    state.game_mode = Some(GameMode::Survival);
    FakeGameClient::new(state)
}

#[tokio::test]
async fn position_broadcast_suppressed_when_unchanged() {
    let sampler = sampler_with(1500);
    let pos = Position { x: 1.2, y: 64.0, z: 3.9 };
    assert!(sampler.maybe_broadcast_position(pos).await.is_some());
    assert!(sampler.maybe_broadcast_position(pos).await.is_none());
    let moved = Position { x: 2.0, y: 64.0, z: 3.9 };
    assert!(sampler.maybe_broadcast_position(moved).await.is_some());
}

#[tokio::test(start_paused = true)]
async fn perception_broadcast_throttles_within_interval() {
    let sampler = sampler_with(1500);
    let client = client_at(0.0, 64.0, 0.0);

    assert!(sampler.maybe_broadcast_perception(&client, false).await.is_some());
    tokio::time::advance(Duration::from_millis(500)).await;
    assert!(sampler.maybe_broadcast_perception(&client, false).await.is_none());
    tokio::time::advance(Duration::from_millis(1100)).await;
    assert!(sampler.maybe_broadcast_perception(&client, false).await.is_some());
}

#[tokio::test]
async fn forced_broadcast_bypasses_throttle() {
    let sampler = sampler_with(30_000);
    let client = client_at(0.0, 64.0, 0.0);
    assert!(sampler.maybe_broadcast_perception(&client, false).await.is_some());
    assert!(sampler.maybe_broadcast_perception(&client, true).await.is_some());
}

#[tokio::test]
async fn hazard_scan_finds_lava_and_void() {
    let sampler = sampler_with(1500);
    let mut state = crate::testutil::FakeGameClientState { dimension: "overworld".to_owned(), ..Default::default() };
    state.position = Some(Position { x: 0.0, y: 64.0, z: 0.0 });
    state.game_mode = Some(GameMode::Survival);
    let client = BlockAwareClient::new(FakeGameClient::new(state));

    let snapshot = sampler.build_snapshot(&client, "test").await.unwrap();
    assert!(snapshot.hazards.liquids >= 1);
    assert_eq!(snapshot.hazards.lava, 1);
    assert!(snapshot.hazards.voids >= 1);
    assert!(snapshot.warnings.iter().any(|w| w.contains("liquid")));
    assert!(snapshot.warnings.iter().any(|w| w.contains("void")));
}

#[tokio::test]
async fn block_light_exactly_seven_emits_no_warning() {
    let sampler = sampler_with(1500);
    let client = EvenLightClient { inner: client_at(0.0, 64.0, 0.0), light: 7 };
    let snapshot = sampler.build_snapshot(&client, "test").await.unwrap();
    assert!(!snapshot.warnings.iter().any(|w| w.contains("low light")));
}

#[tokio::test]
async fn block_light_below_seven_emits_warning() {
    let sampler = sampler_with(1500);
    let client = EvenLightClient { inner: client_at(0.0, 64.0, 0.0), light: 6 };
    let snapshot = sampler.build_snapshot(&client, "test").await.unwrap();
    assert!(snapshot.warnings.iter().any(|w| w.contains("low light")));
}

#[test]
fn bearing_buckets_classify_all_quadrants() {
    use crate::game_client::Bearing;
    assert_eq!(Bearing::from_offset(0.0, 1.0), Bearing::N);
    assert_eq!(Bearing::from_offset(1.0, 0.0), Bearing::E);
    assert_eq!(Bearing::from_offset(0.0, -1.0), Bearing::S);
    assert_eq!(Bearing::from_offset(-1.0, 0.0), Bearing::W);
}

#[tokio::test]
async fn nearby_entities_sorted_and_capped_at_five() {
    let sampler = sampler_with(1500);
    let mut state = crate::testutil::FakeGameClientState { dimension: "overworld".to_owned(), ..Default::default() };
    state.position = Some(Position { x: 0.0, y: 64.0, z: 0.0 });
    state.game_mode = Some(GameMode::Survival);
    state.entities = (0..8)
        .map(|i| EntitySnapshot {
            name: format!("zombie{i}"),
            kind: crate::game_client::EntityKind::Hostile,
            position: Position { x: (8 - i) as f64, y: 64.0, z: 0.0 },
        })
        .collect();
    let client = FakeGameClient::new(state);
    let snapshot = sampler.build_snapshot(&client, "test").await.unwrap();
    assert_eq!(snapshot.entities.total, 8);
    assert_eq!(snapshot.entities.details.len(), 5);
    assert_eq!(snapshot.entities.details[0].name, "zombie7");
}

struct BlockAwareClient {
    inner: FakeGameClient,
}

impl BlockAwareClient {
    fn new(inner: FakeGameClient) -> Self {
        Self { inner }
    }
}

impl GameClient for BlockAwareClient {
    fn position(&self) -> Option<Position> {
        self.inner.position()
    }
    fn velocity(&self) -> Option<Position> {
        self.inner.velocity()
    }
    fn yaw_pitch(&self) -> Option<(f64, f64)> {
        self.inner.yaw_pitch()
    }
    fn on_ground(&self) -> bool {
        self.inner.on_ground()
    }
    fn dimension(&self) -> String {
        self.inner.dimension()
    }
    fn health(&self) -> Option<f64> {
        self.inner.health()
    }
    fn food_level(&self) -> Option<f64> {
        self.inner.food_level()
    }
    fn saturation(&self) -> Option<f64> {
        self.inner.saturation()
    }
    fn oxygen(&self) -> Option<f64> {
        self.inner.oxygen()
    }
    fn game_mode(&self) -> GameMode {
        self.inner.game_mode()
    }
    fn weather(&self) -> crate::game_client::WeatherState {
        self.inner.weather()
    }
    fn time(&self) -> crate::game_client::TimeState {
        self.inner.time()
    }
    fn light_at(&self, x: i64, y: i64, z: i64) -> Option<crate::game_client::LightLevels> {
        self.inner.light_at(x, y, z)
    }
    fn block_at(&self, x: i64, y: i64, z: i64) -> Option<crate::game_client::BlockInfo> {
        use crate::game_client::BlockInfo;
        if (x, y, z) == (2, 64, 0) {
            return Some(BlockInfo { name: "lava".to_owned(), is_liquid: true, is_empty: false });
        }
        if (x, y, z) == (-1, 63, 0) || (x, y, z) == (-1, 62, 0) {
            return Some(BlockInfo { name: "air".to_owned(), is_liquid: false, is_empty: true });
        }
        Some(BlockInfo { name: "stone".to_owned(), is_liquid: false, is_empty: false })
    }
    fn nearby_entities(&self, radius: u32) -> Vec<EntitySnapshot> {
        self.inner.nearby_entities(radius)
    }
    fn inventory(&self) -> Vec<crate::game_client::InventorySlot> {
        self.inner.inventory()
    }
    fn held_item(&self) -> Option<String> {
        self.inner.held_item()
    }
    async fn goto(&self, goal: crate::game_client::Goal, profile: crate::game_client::MovementProfile) -> Result<(), crate::game_client::PathfindError> {
        self.inner.goto(goal, profile).await
    }
    async fn stop_pathfinding(&self) {
        self.inner.stop_pathfinding().await
    }
    async fn set_control_state(&self, control: crate::game_client::ControlKey, state: bool) {
        self.inner.set_control_state(control, state).await
    }
    async fn clear_control_states(&self) {
        self.inner.clear_control_states().await
    }
    async fn look_at(&self, yaw: f64, pitch: f64) {
        self.inner.look_at(yaw, pitch).await
    }
    async fn chat(&self, text: &str) {
        self.inner.chat(text).await
    }
    async fn equip(&self, item_name: &str) -> Result<(), String> {
        self.inner.equip(item_name).await
    }
    async fn consume_held_item(&self) -> Result<(), String> {
        self.inner.consume_held_item().await
    }
}

struct EvenLightClient {
    inner: FakeGameClient,
    light: u8,
}

impl GameClient for EvenLightClient {
    fn position(&self) -> Option<Position> {
        self.inner.position()
    }
    fn velocity(&self) -> Option<Position> {
        self.inner.velocity()
    }
    fn yaw_pitch(&self) -> Option<(f64, f64)> {
        self.inner.yaw_pitch()
    }
    fn on_ground(&self) -> bool {
        self.inner.on_ground()
    }
    fn dimension(&self) -> String {
        self.inner.dimension()
    }
    fn health(&self) -> Option<f64> {
        self.inner.health()
    }
    fn food_level(&self) -> Option<f64> {
        self.inner.food_level()
    }
    fn saturation(&self) -> Option<f64> {
        self.inner.saturation()
    }
    fn oxygen(&self) -> Option<f64> {
        self.inner.oxygen()
    }
    fn game_mode(&self) -> GameMode {
        self.inner.game_mode()
    }
    fn weather(&self) -> crate::game_client::WeatherState {
        self.inner.weather()
    }
    fn time(&self) -> crate::game_client::TimeState {
        self.inner.time()
    }
    fn light_at(&self, _x: i64, _y: i64, _z: i64) -> Option<crate::game_client::LightLevels> {
        Some(crate::game_client::LightLevels { sky: self.light, block: self.light })
    }
    fn block_at(&self, x: i64, y: i64, z: i64) -> Option<crate::game_client::BlockInfo> {
        self.inner.block_at(x, y, z)
    }
    fn nearby_entities(&self, radius: u32) -> Vec<EntitySnapshot> {
        self.inner.nearby_entities(radius)
    }
    fn inventory(&self) -> Vec<crate::game_client::InventorySlot> {
        self.inner.inventory()
    }
    fn held_item(&self) -> Option<String> {
        self.inner.held_item()
    }
    async fn goto(&self, goal: crate::game_client::Goal, profile: crate::game_client::MovementProfile) -> Result<(), crate::game_client::PathfindError> {
        self.inner.goto(goal, profile).await
    }
    async fn stop_pathfinding(&self) {
        self.inner.stop_pathfinding().await
    }
    async fn set_control_state(&self, control: crate::game_client::ControlKey, state: bool) {
        self.inner.set_control_state(control, state).await
    }
    async fn clear_control_states(&self) {
        self.inner.clear_control_states().await
    }
    async fn look_at(&self, yaw: f64, pitch: f64) {
        self.inner.look_at(yaw, pitch).await
    }
    async fn chat(&self, text: &str) {
        self.inner.chat(text).await
    }
    async fn equip(&self, item_name: &str) -> Result<(), String> {
        self.inner.equip(item_name).await
    }
    async fn consume_held_item(&self) -> Result<(), String> {
        self.inner.consume_held_item().await
    }
}
