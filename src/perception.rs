// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Perception Sampler (spec §4.6): builds position/inventory/general/
//! environment snapshots, scans hazards, and throttles outbound perception
//! and position broadcasts.

use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::Instrument;

use crate::clock::unix_millis;
use crate::config::PerceptionConfig;
use crate::game_client::{Bearing, EntityKind, GameClient, GameMode, Position};
use crate::telemetry::Instruments;

#[derive(Debug, Clone, serde::Serialize)]
pub struct ClosestHazard {
    pub distance: f64,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct HazardScan {
    pub liquids: u32,
    pub lava: u32,
    pub magma: u32,
    pub voids: u32,
    pub closest_liquid: Option<ClosestHazard>,
    pub closest_void: Option<ClosestHazard>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct NearbyEntitySummary {
    pub name: String,
    pub kind: EntityKind,
    pub distance: f64,
    pub bearing: Bearing,
    pub position: (i64, i64, i64),
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct EntityScan {
    pub total: usize,
    pub hostiles: usize,
    pub players: usize,
    pub details: Vec<NearbyEntitySummary>,
}

/// A point-in-time summary of environment, hazards, entities, lighting,
/// weather, and status (spec §3 "Perception Snapshot", glossary).
#[derive(Debug, Clone, serde::Serialize)]
pub struct PerceptionSnapshot {
    pub position: (i64, i64, i64),
    pub dimension: String,
    pub is_raining: bool,
    pub rain_level: f64,
    pub thunder_level: f64,
    pub weather_label: &'static str,
    pub age: u64,
    pub day: u64,
    pub time_of_day: u64,
    pub is_day: bool,
    pub sky_light: Option<u8>,
    pub block_light: Option<u8>,
    pub entities: EntityScan,
    pub hazards: HazardScan,
    pub warnings: Vec<String>,
    pub summary: String,
}

pub struct PerceptionSampler {
    config: PerceptionConfig,
    instruments: Instruments,
    last_snapshot: RwLock<Option<PerceptionSnapshot>>,
    last_broadcast_at: RwLock<Option<u64>>,
    last_position_broadcast: RwLock<Option<(i64, i64, i64)>>,
}

impl PerceptionSampler {
    pub fn new(config: PerceptionConfig, instruments: Instruments) -> Self {
        Self {
            config,
            instruments,
            last_snapshot: RwLock::new(None),
            last_broadcast_at: RwLock::new(None),
            last_position_broadcast: RwLock::new(None),
        }
    }

    /// Builds a fresh perception snapshot, instrumented with a build-time
    /// histogram and an error counter (spec §4.6 "Timing and errors").
    pub async fn build_snapshot(&self, client: &dyn GameClient, reason: &str) -> Option<PerceptionSnapshot> {
        let span = tracing::info_span!("perception.snapshot", reason, dimension = %client.dimension());
        async {
            let start = std::time::Instant::now();
            let result = self.build_snapshot_inner(client);
            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
            self.instruments.snapshot_build_duration.record(
                elapsed_ms,
                &[
                    opentelemetry::KeyValue::new("reason", reason.to_owned()),
                    opentelemetry::KeyValue::new("dimension", client.dimension()),
                ],
            );
            if result.is_none() {
                self.instruments.errors_total.record(1, &[opentelemetry::KeyValue::new("kind", "snapshot_build")]);
            } else {
                *self.last_snapshot.write().await = result.clone();
            }
            result
        }
        .instrument(span)
        .await
    }

    fn build_snapshot_inner(&self, client: &dyn GameClient) -> Option<PerceptionSnapshot> {
        let position = client.position()?;
        let floored = position.floor();

        let weather = client.weather();
        let weather_label = if weather.thunder_level > 0.0 {
            "thunder"
        } else if weather.is_raining {
            "rain"
        } else {
            "clear"
        };

        let time = client.time();
        let is_day = time.time_of_day < 12000;

        let light = client.light_at(floored.0, floored.1, floored.2);

        let entities = self.scan_entities(client, position);
        let hazards = self.scan_hazards(client, floored);

        let mut warnings = Vec::new();
        if hazards.liquids > 0 {
            warnings.push("liquid hazard nearby".to_owned());
        }
        if hazards.voids > 0 {
            warnings.push("void hazard nearby".to_owned());
        }
        if let Some(light) = light {
            if light.block < 7 {
                warnings.push(format!("low light level ({})", light.block));
            }
        }
        if entities.hostiles > 0 {
            let labelled: Vec<&str> =
                entities.details.iter().filter(|e| e.kind == EntityKind::Hostile).map(|e| e.name.as_str()).take(3).collect();
            if !labelled.is_empty() {
                warnings.push(format!("hostiles nearby: {}", labelled.join(", ")));
            }
        }

        let summary = [
            (entities.hostiles > 0).then(|| format!("hostiles:{}", entities.hostiles)),
            (hazards.liquids > 0).then(|| "liquid".to_owned()),
            (hazards.voids > 0).then(|| "void".to_owned()),
            Some(weather_label.to_owned()),
            light.map(|l| format!("light:{}", l.block)),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("/");

        Some(PerceptionSnapshot {
            position: floored,
            dimension: client.dimension(),
            is_raining: weather.is_raining,
            rain_level: weather.rain_level,
            thunder_level: weather.thunder_level,
            weather_label,
            age: time.age,
            day: time.day,
            time_of_day: time.time_of_day,
            is_day,
            sky_light: light.map(|l| l.sky),
            block_light: light.map(|l| l.block),
            entities,
            hazards,
            warnings,
            summary,
        })
    }

    fn scan_entities(&self, client: &dyn GameClient, origin: Position) -> EntityScan {
        let mut scanned: Vec<(f64, NearbyEntitySummary)> = client
            .nearby_entities(self.config.entity_radius)
            .into_iter()
            .map(|entity| {
                let distance = origin.distance_to(entity.position);
                let dx = entity.position.x - origin.x;
                let dz = entity.position.z - origin.z;
                (
                    distance,
                    NearbyEntitySummary {
                        name: entity.name,
                        kind: entity.kind,
                        distance,
                        bearing: Bearing::from_offset(dx, dz),
                        position: entity.position.floor(),
                    },
                )
            })
            .collect();
        scanned.sort_by(|a, b| a.0.total_cmp(&b.0));

        let total = scanned.len();
        let hostiles = scanned.iter().filter(|(_, e)| e.kind == EntityKind::Hostile).count();
        let players = scanned.iter().filter(|(_, e)| e.kind == EntityKind::Player).count();
        let details = scanned.into_iter().take(5).map(|(_, e)| e).collect();

        EntityScan { total, hostiles, players, details }
    }

    fn scan_hazards(&self, client: &dyn GameClient, floored: (i64, i64, i64)) -> HazardScan {
        let (cx, cy, cz) = floored;
        let radius = self.config.block_radius as i64;
        let height = self.config.block_height as i64;
        let mut scan = HazardScan::default();

        for dx in -radius..=radius {
            for dz in -radius..=radius {
                for dy in -height..=height {
                    let (x, y, z) = (cx + dx, cy + dy, cz + dz);
                    let Some(block) = client.block_at(x, y, z) else { continue };
                    let distance = ((dx * dx + dy * dy + dz * dz) as f64).sqrt();
                    let name_lower = block.name.to_ascii_lowercase();

                    if block.is_liquid || name_lower.contains("water") || name_lower.contains("lava") {
                        scan.liquids += 1;
                        if name_lower.contains("lava") {
                            scan.lava += 1;
                        }
                        let closer = scan.closest_liquid.as_ref().map(|c| distance < c.distance).unwrap_or(true);
                        if closer {
                            scan.closest_liquid = Some(ClosestHazard { distance });
                        }
                    }

                    if name_lower == "magma_block" {
                        scan.magma += 1;
                    }

                    if dy < 0 && block.is_empty {
                        if let Some(below) = client.block_at(x, y - 1, z) {
                            if below.is_empty {
                                scan.voids += 1;
                                let closer = scan.closest_void.as_ref().map(|c| distance < c.distance).unwrap_or(true);
                                if closer {
                                    scan.closest_void = Some(ClosestHazard { distance });
                                }
                            }
                        }
                    }
                }
            }
        }

        scan
    }

    /// `broadcastPerception` (spec §4.6): returns `Some(payload)` only when
    /// the event should actually be enqueued.
    pub async fn maybe_broadcast_perception(&self, client: &dyn GameClient, force: bool) -> Option<Value> {
        let now = unix_millis();
        let last = *self.last_broadcast_at.read().await;
        let due = force || last.map(|t| now.saturating_sub(t) >= self.config.broadcast_interval.as_millis() as u64).unwrap_or(true);
        if !due {
            return None;
        }

        let snapshot = match self.build_snapshot(client, "broadcast").await {
            Some(s) => s,
            None => self.last_snapshot.read().await.clone()?,
        };

        *self.last_broadcast_at.write().await = Some(now);
        Some(serde_json::to_value(&snapshot).unwrap_or_else(|_| json!({})))
    }

    /// `broadcastPosition` (spec §4.6): enqueues only if the floored
    /// coordinate differs from the previous broadcast.
    pub async fn maybe_broadcast_position(&self, position: Position) -> Option<Value> {
        let floored = position.floor();
        let mut last = self.last_position_broadcast.write().await;
        if *last == Some(floored) {
            return None;
        }
        *last = Some(floored);
        Some(json!({ "x": floored.0, "y": floored.1, "z": floored.2 }))
    }

    pub fn dig_permission(&self, client: &dyn GameClient, dig_permissive_initialised: bool, dig_permissive_can_dig: bool) -> Value {
        let game_mode = client.game_mode();
        let allowed = !matches!(game_mode, GameMode::Adventure | GameMode::Spectator) && dig_permissive_initialised && dig_permissive_can_dig;
        let reason = if allowed {
            "dig permitted".to_owned()
        } else if matches!(game_mode, GameMode::Adventure | GameMode::Spectator) {
            format!("game mode {game_mode:?} forbids digging")
        } else if !dig_permissive_initialised {
            "dig-permissive profile not initialised".to_owned()
        } else {
            "dig-permissive profile disallows digging".to_owned()
        };
        json!({
            "allowed": allowed,
            "gameMode": format!("{game_mode:?}").to_lowercase(),
            "fallbackMovementInitialized": dig_permissive_initialised,
            "reason": reason,
        })
    }

    pub fn broadcast_interval(&self) -> Duration {
        self.config.broadcast_interval
    }
}

#[cfg(test)]
#[path = "perception_tests.rs"]
mod tests;
