// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Action Playback Engine (spec §4.7): validates and replays tick-quantised
//! control/look/wait sequences. Single-flight guard mirrors the teacher's
//! `AtomicU32` failure-counter idiom applied to a boolean in-progress flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::config::{ControlMode, PlaybackConfig};
use crate::error::BotError;
use crate::game_client::{ControlKey, GameClient};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum RawAction {
    Control { control: String, state: bool, #[serde(rename = "durationTicks")] duration_ticks: Value },
    Look {
        yaw: f64,
        #[serde(default)]
        pitch: f64,
        #[serde(default)]
        relative: bool,
        #[serde(rename = "durationTicks", default)]
        duration_ticks: Option<Value>,
    },
    Wait {
        #[serde(rename = "durationTicks")]
        duration_ticks: Value,
    },
}

#[derive(Debug, Clone)]
enum Action {
    Control { control: ControlKey, state: bool, duration_ticks: u32 },
    Look { yaw: f64, pitch: f64, relative: bool, duration_ticks: Option<u32> },
    Wait { duration_ticks: u32 },
}

fn parse_control(raw: &str) -> Option<ControlKey> {
    match raw {
        "forward" => Some(ControlKey::Forward),
        "back" => Some(ControlKey::Back),
        "left" => Some(ControlKey::Left),
        "right" => Some(ControlKey::Right),
        "jump" => Some(ControlKey::Jump),
        "sprint" => Some(ControlKey::Sprint),
        "sneak" => Some(ControlKey::Sneak),
        "attack" => Some(ControlKey::Attack),
        "use" => Some(ControlKey::Use),
        _ => None,
    }
}

fn ticks_from_value(value: &Value) -> Option<u32> {
    let n = value.as_f64()?;
    if !n.is_finite() || n < 0.0 {
        return None;
    }
    Some(n.round() as u32)
}

fn validate(raw: Vec<RawAction>, max_len: usize) -> Result<Vec<Action>, BotError> {
    if raw.len() > max_len {
        return Err(BotError::InvalidPlaybackSequence(format!("sequence length {} exceeds max {}", raw.len(), max_len)));
    }

    raw.into_iter()
        .map(|action| match action {
            RawAction::Control { control, state, duration_ticks } => {
                let control = parse_control(&control)
                    .ok_or_else(|| BotError::InvalidPlaybackSequence(format!("unknown control {control:?}")))?;
                let duration_ticks = ticks_from_value(&duration_ticks)
                    .ok_or_else(|| BotError::InvalidPlaybackSequence("invalid durationTicks".to_owned()))?;
                Ok(Action::Control { control, state, duration_ticks })
            }
            RawAction::Look { yaw, pitch, relative, duration_ticks } => {
                if !yaw.is_finite() || !pitch.is_finite() {
                    return Err(BotError::InvalidPlaybackSequence("non-finite yaw/pitch".to_owned()));
                }
                let duration_ticks = match duration_ticks {
                    Some(v) => Some(
                        ticks_from_value(&v)
                            .ok_or_else(|| BotError::InvalidPlaybackSequence("invalid durationTicks".to_owned()))?,
                    ),
                    None => None,
                };
                Ok(Action::Look { yaw, pitch, relative, duration_ticks })
            }
            RawAction::Wait { duration_ticks } => {
                let duration_ticks = ticks_from_value(&duration_ticks)
                    .ok_or_else(|| BotError::InvalidPlaybackSequence("invalid durationTicks".to_owned()))?;
                Ok(Action::Wait { duration_ticks })
            }
        })
        .collect()
}

pub struct PlaybackEngine {
    control_mode: ControlMode,
    tick_interval: Duration,
    max_sequence_length: usize,
    in_progress: AtomicBool,
}

impl PlaybackEngine {
    pub fn new(config: &PlaybackConfig) -> Self {
        Self {
            control_mode: config.control_mode,
            tick_interval: config.tick_interval,
            max_sequence_length: config.max_sequence_length,
            in_progress: AtomicBool::new(false),
        }
    }

    /// Executes `actions` (already JSON `Value`) against `client`. Rejects
    /// before validation when `CONTROL_MODE=command` (Design Notes "control
    /// mode").
    pub async fn play(&self, client: &dyn GameClient, actions: Value) -> Result<(), BotError> {
        if !self.control_mode.allows_playback() {
            return Err(BotError::PlaybackDisabled(self.control_mode));
        }

        let Value::Array(_) = &actions else {
            return Err(BotError::InvalidPlaybackSequence("top-level value must be an array".to_owned()));
        };
        let raw: Vec<RawAction> = serde_json::from_value(actions)
            .map_err(|e| BotError::InvalidPlaybackSequence(format!("malformed action: {e}")))?;
        let actions = validate(raw, self.max_sequence_length)?;

        if self.in_progress.swap(true, Ordering::SeqCst) {
            return Err(BotError::PlaybackInProgress);
        }

        let result = self.execute(client, actions).await;

        client.clear_control_states().await;
        self.in_progress.store(false, Ordering::SeqCst);
        result
    }

    async fn execute(&self, client: &dyn GameClient, actions: Vec<Action>) -> Result<(), BotError> {
        client.stop_pathfinding().await;
        client.clear_control_states().await;

        for action in actions {
            match action {
                Action::Control { control, state, duration_ticks } => {
                    client.set_control_state(control, state).await;
                    self.sleep_ticks(duration_ticks).await;
                }
                Action::Look { yaw, pitch, relative, duration_ticks } => {
                    let (current_yaw, current_pitch) = client.yaw_pitch().unwrap_or((0.0, 0.0));
                    let (abs_yaw, abs_pitch) = if relative {
                        (current_yaw + yaw, current_pitch + pitch)
                    } else {
                        (yaw, pitch)
                    };
                    let clamped_pitch = abs_pitch.clamp(-std::f64::consts::FRAC_PI_2, std::f64::consts::FRAC_PI_2);
                    client.look_at(abs_yaw, clamped_pitch).await;
                    if let Some(ticks) = duration_ticks {
                        self.sleep_ticks(ticks).await;
                    }
                }
                Action::Wait { duration_ticks } => {
                    self.sleep_ticks(duration_ticks).await;
                }
            }
        }

        info!("playback sequence completed");
        Ok(())
    }

    async fn sleep_ticks(&self, ticks: u32) {
        if ticks == 0 {
            return;
        }
        Clock.sleep(self.tick_interval * ticks).await;
    }

    pub fn is_in_progress(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        if self.in_progress.load(Ordering::SeqCst) {
            warn!("playback engine dropped while a sequence was in progress");
        }
    }
}

#[cfg(test)]
#[path = "playback_tests.rs"]
mod tests;
