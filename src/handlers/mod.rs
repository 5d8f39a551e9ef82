// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin verb-to-component adapters (spec §4.3, §4.5-§4.9): validate args,
//! call into the owning component, map errors to a [`CommandResponse`].
//! Handler style (validate → call state → map error → respond) grounded on
//! the teacher's `transport/http.rs`.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::envelope::{AgentRole, CommandResponse, Verb};
use crate::error::BotError;
use crate::game_client::GameClientFactory;
use crate::state::AppState;

fn arg_f64(args: &serde_json::Map<String, Value>, key: &str) -> Option<f64> {
    args.get(key).and_then(Value::as_f64)
}

fn arg_str<'a>(args: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

fn arg_str_vec(args: &serde_json::Map<String, Value>, key: &str) -> Vec<String> {
    args.get(key)
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_owned)).collect())
        .unwrap_or_default()
}

/// Dispatches a parsed verb to its handler (spec §4.3). `args` is the
/// `Value::Object` of the inbound envelope's `args` field.
pub async fn dispatch<F: GameClientFactory + 'static>(
    state: &Arc<AppState<F>>,
    verb: Verb,
    args: serde_json::Map<String, Value>,
) -> CommandResponse {
    let result = match verb {
        Verb::Chat => chat(state, &args).await,
        Verb::MoveTo => move_to(state, &args).await,
        Verb::EquipItem => equip_item(state, &args).await,
        Verb::GatherStatus => gather_status(state, &args).await,
        Verb::GatherVptObservation => gather_vpt_observation(state).await,
        Verb::MineOre => mine_ore(state, &args).await,
        Verb::SetAgentRole => set_agent_role(state, &args).await,
        Verb::RegisterSkill => register_skill(state, &args).await,
        Verb::InvokeSkill => invoke_skill(state, &args).await,
        Verb::SkillExplore => skill_explore(state, &args).await,
        Verb::PlayVptActions => play_vpt_actions(state, &args).await,
    };

    match result {
        Ok(data) => match data {
            Value::Null => CommandResponse::ok(),
            other => CommandResponse::ok_with(other),
        },
        Err(err) => err.into(),
    }
}

async fn chat<F: GameClientFactory + 'static>(state: &Arc<AppState<F>>, args: &serde_json::Map<String, Value>) -> Result<Value, BotError> {
    let text = arg_str(args, "text").ok_or(BotError::InvalidPayload)?;
    let client = state.lifecycle.active_client().await.ok_or(BotError::NotConnected)?;
    client.chat(text).await;
    Ok(Value::Null)
}

async fn move_to<F: GameClientFactory + 'static>(state: &Arc<AppState<F>>, args: &serde_json::Map<String, Value>) -> Result<Value, BotError> {
    let x = arg_f64(args, "x").unwrap_or(f64::NAN);
    let y = arg_f64(args, "y").unwrap_or(f64::NAN);
    let z = arg_f64(args, "z").unwrap_or(f64::NAN);
    state.navigation.move_to(x, y, z).await?;
    Ok(Value::Null)
}

async fn equip_item<F: GameClientFactory + 'static>(state: &Arc<AppState<F>>, args: &serde_json::Map<String, Value>) -> Result<Value, BotError> {
    let item = arg_str(args, "item").ok_or(BotError::InvalidPayload)?;
    let client = state.lifecycle.active_client().await.ok_or(BotError::NotConnected)?;
    client.equip(item).await.map_err(BotError::Domain)?;
    Ok(Value::Null)
}

async fn gather_status<F: GameClientFactory + 'static>(state: &Arc<AppState<F>>, args: &serde_json::Map<String, Value>) -> Result<Value, BotError> {
    let kind = arg_str(args, "kind").unwrap_or("general");
    let client = state.lifecycle.active_client().await.ok_or(BotError::NotConnected)?;

    match kind {
        "position" => {
            let position = client.position().ok_or(BotError::NotConnected)?;
            let (x, y, z) = position.floor();
            Ok(json!({ "x": x, "y": y, "z": z, "dimension": client.dimension() }))
        }
        "inventory" => {
            let items = client.inventory();
            let occupied = items.len();
            let torches = items.iter().filter(|i| i.name == "torch").map(|i| i.count).sum::<u32>();
            Ok(json!({
                "occupiedSlots": occupied,
                "items": items.iter().map(|i| json!({
                    "slot": i.slot,
                    "name": i.name,
                    "displayName": i.display_name,
                    "count": i.count,
                    "enchantments": i.enchantments,
                    "durability": i.durability,
                    "isPickaxe": i.name.ends_with("_pickaxe"),
                })).collect::<Vec<_>>(),
                "torchCount": torches,
            }))
        }
        "general" => {
            let snapshot = state.perception.build_snapshot(&*client, "gatherStatus").await;
            let role = state.lifecycle.current_role().await;
            Ok(json!({
                "health": client.health().map(|h| h.round()),
                "maxHealth": 20.0,
                "food": client.food_level().map(|f| f.round()),
                "saturation": client.saturation().map(|s| (s * 10.0).round() / 10.0),
                "oxygen": client.oxygen(),
                "digPermission": state.perception.dig_permission(&*client, true, true),
                "perception": snapshot,
                "role": role.role,
            }))
        }
        "environment" => {
            let snapshot = state.perception.build_snapshot(&*client, "gatherStatus").await;
            let role = state.lifecycle.current_role().await;
            Ok(json!({
                "perception": snapshot,
                "role": role.role,
                "queueSize": state.bridge.queue_len().await,
            }))
        }
        _ => Err(BotError::InvalidPayload),
    }
}

async fn gather_vpt_observation<F: GameClientFactory + 'static>(state: &Arc<AppState<F>>) -> Result<Value, BotError> {
    let client = state.lifecycle.active_client().await.ok_or(BotError::NotConnected)?;
    let position = client.position().ok_or(BotError::NotConnected)?;
    let (yaw, pitch) = client.yaw_pitch().unwrap_or((0.0, 0.0));
    let target = state.navigation.last_move_target().await;

    let navigation_hint = target.map(|(tx, ty, tz)| {
        let dx = tx - position.x;
        let dz = tz - position.z;
        let horizontal_distance = (dx * dx + dz * dz).sqrt();
        let target_yaw_degrees = (-dx).atan2(dz).to_degrees();
        json!({
            "targetYawDegrees": target_yaw_degrees,
            "horizontalDistance": horizontal_distance,
            "verticalOffset": ty - position.y,
        })
    });

    Ok(json!({
        "position": { "x": position.x, "y": position.y, "z": position.z },
        "velocity": client.velocity().map(|v| json!({ "x": v.x, "y": v.y, "z": v.z })),
        "yawDegrees": yaw.to_degrees(),
        "pitchDegrees": pitch.to_degrees(),
        "health": client.health().map(|h| h.round()),
        "food": client.food_level().map(|f| f.round()),
        "saturation": client.saturation().map(|s| (s * 10.0).round() / 10.0),
        "onGround": client.on_ground(),
        "heldItem": client.held_item(),
        "navigationHint": navigation_hint,
        "dimension": client.dimension(),
        "timestamp": crate::clock::unix_millis(),
    }))
}

/// Closed set of recognised ore names. Domain-unknown requests return a
/// partial resolution alongside the error (spec §7 "Domain-unknown").
const KNOWN_ORES: &[&str] = &["coal", "iron", "copper", "gold", "redstone", "lapis", "diamond", "emerald", "netherite"];

async fn mine_ore<F: GameClientFactory + 'static>(state: &Arc<AppState<F>>, args: &serde_json::Map<String, Value>) -> Result<Value, BotError> {
    let ore = arg_str(args, "ore").ok_or(BotError::InvalidPayload)?;
    let normalised = ore.trim().to_ascii_lowercase();
    if !KNOWN_ORES.contains(&normalised.as_str()) {
        return Err(BotError::Domain(format!("unknown ore {ore:?}, recognised ores: {}", KNOWN_ORES.join(", "))));
    }
    let client = state.lifecycle.active_client().await.ok_or(BotError::NotConnected)?;
    let position = client.position().ok_or(BotError::NotConnected)?;
    state.navigation.move_to(position.x, position.y, position.z).await?;
    Ok(json!({ "ore": normalised }))
}

async fn set_agent_role<F: GameClientFactory + 'static>(state: &Arc<AppState<F>>, args: &serde_json::Map<String, Value>) -> Result<Value, BotError> {
    let role = arg_str(args, "role").unwrap_or("generalist");
    let parsed = AgentRole::parse(role);
    let updated = state.lifecycle.apply_role_update(parsed).await;
    Ok(json!({
        "role": parsed.label(),
        "responsibilities": parsed.responsibilities(),
        "lastEventId": updated.last_event_id,
        "lastUpdatedAt": updated.last_updated_at,
    }))
}

async fn register_skill<F: GameClientFactory + 'static>(state: &Arc<AppState<F>>, args: &serde_json::Map<String, Value>) -> Result<Value, BotError> {
    let id = arg_str(args, "id").unwrap_or_default().to_owned();
    let title = arg_str(args, "title").unwrap_or_default().to_owned();
    let description = arg_str(args, "description").unwrap_or_default().to_owned();
    let steps = arg_str_vec(args, "steps");
    let tags = arg_str_vec(args, "tags");
    state.skills.register(id, title, description, steps, tags).await?;
    Ok(Value::Null)
}

async fn invoke_skill<F: GameClientFactory + 'static>(state: &Arc<AppState<F>>, args: &serde_json::Map<String, Value>) -> Result<Value, BotError> {
    let id = arg_str(args, "id").ok_or(BotError::InvalidPayload)?;
    let context = args.get("context").cloned();
    let steps = state.skills.invoke(id, context).await?;
    if let Some(client) = state.lifecycle.active_client().await {
        client.chat(&format!("invoking skill {id}")).await;
    }
    Ok(json!({ "steps": steps }))
}

async fn skill_explore<F: GameClientFactory + 'static>(state: &Arc<AppState<F>>, args: &serde_json::Map<String, Value>) -> Result<Value, BotError> {
    let id = arg_str(args, "id").ok_or(BotError::InvalidPayload)?;
    let description = arg_str(args, "description").unwrap_or_default();
    let context = args.get("context").cloned();
    state.skills.explore(id, description, context).await;
    if let Some(client) = state.lifecycle.active_client().await {
        client.chat(&format!("exploring {id}: {description}")).await;
    }
    Ok(Value::Null)
}

async fn play_vpt_actions<F: GameClientFactory + 'static>(state: &Arc<AppState<F>>, args: &serde_json::Map<String, Value>) -> Result<Value, BotError> {
    let actions = args.get("actions").cloned().unwrap_or(Value::Array(vec![]));
    let client = state.lifecycle.active_client().await.ok_or(BotError::NotConnected)?;
    state.playback.play(&*client, actions).await?;
    Ok(Value::Null)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
