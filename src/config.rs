// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Config Resolver: normalises process-environment options into a [`Config`],
//! collecting a [`ConfigWarning`] for every value it clamped, defaulted, or
//! rewrote. Pure function of an [`EnvSource`] so it can be exercised against a
//! fake environment in tests without touching `std::env`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Source of environment variables. Implemented for the real process
/// environment and for an in-memory map in tests.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;
}

/// The real process environment.
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// An in-memory environment, for tests.
#[derive(Debug, Clone, Default)]
pub struct FakeEnv(pub HashMap<String, String>);

impl EnvSource for FakeEnv {
    fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }
}

/// A single clamp/default/rewrite decision made while resolving config.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ConfigWarning {
    pub key: &'static str,
    pub message: String,
}

impl ConfigWarning {
    fn new(key: &'static str, message: impl Into<String>) -> Self {
        Self { key, message: message.into() }
    }
}

/// Game-server authentication mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    Offline,
    Microsoft,
}

/// Control-mode gate for the Action Playback Engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlMode {
    Command,
    Vpt,
    Hybrid,
}

impl ControlMode {
    pub fn allows_playback(self) -> bool {
        !matches!(self, ControlMode::Command)
    }
}

/// Game-server and bot-identity settings.
#[derive(Debug, Clone)]
pub struct GameServerConfig {
    pub host: String,
    pub port: u16,
    pub version: Option<String>,
    pub reconnect_delay: Duration,
    pub username: String,
    pub auth_mode: AuthMode,
}

/// Command Router bind address.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub host: String,
    pub port: u16,
}

/// Agent Event Bridge tuning.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub url: String,
    pub connect_timeout: Duration,
    pub send_timeout: Duration,
    pub healthcheck_interval: Duration,
    pub reconnect_delay: Duration,
    pub max_retries: u32,
    pub batch_interval: Duration,
    pub batch_max_size: usize,
    pub queue_max_size: usize,
}

/// Navigation Controller tuning.
#[derive(Debug, Clone)]
pub struct NavigationConfig {
    pub move_goal_tolerance: u32,
    pub allow_parkour: bool,
    pub allow_sprinting: bool,
    pub dig_cost_enabled: u32,
    pub dig_cost_disabled: u32,
    pub forced_move_retry_window: Duration,
    pub forced_move_max_retries: u32,
    pub forced_move_retry_delay: Duration,
}

/// Action Playback Engine tuning.
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    pub control_mode: ControlMode,
    pub tick_interval: Duration,
    pub max_sequence_length: usize,
}

/// Perception Sampler tuning.
#[derive(Debug, Clone)]
pub struct PerceptionConfig {
    pub entity_radius: u32,
    pub block_radius: u32,
    pub block_height: u32,
    pub broadcast_interval: Duration,
}

/// Telemetry exporter settings.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub otlp_endpoint: Option<String>,
    pub service_name: String,
    pub deployment_environment: String,
    pub sampler_ratio: f64,
}

/// Fully resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub game_server: GameServerConfig,
    pub router: RouterConfig,
    pub bridge: BridgeConfig,
    pub navigation: NavigationConfig,
    pub playback: PlaybackConfig,
    pub perception: PerceptionConfig,
    pub telemetry: TelemetryConfig,
    pub skill_history_path: PathBuf,
}

fn clamp_u32(
    env: &impl EnvSource,
    key: &'static str,
    min: u32,
    max: u32,
    default: u32,
    warnings: &mut Vec<ConfigWarning>,
) -> u32 {
    let Some(raw) = env.get(key) else { return default };
    match raw.trim().parse::<i64>() {
        Ok(v) => {
            let clamped = v.clamp(min as i64, max as i64) as u32;
            if clamped as i64 != v {
                warnings.push(ConfigWarning::new(
                    key,
                    format!("{v} out of range [{min}, {max}], clamped to {clamped}"),
                ));
            }
            clamped
        }
        Err(_) => {
            warnings.push(ConfigWarning::new(key, format!("{raw:?} is not a valid integer, using default {default}")));
            default
        }
    }
}

fn parse_bool(env: &impl EnvSource, key: &'static str, default: bool) -> bool {
    match env.get(key).as_deref() {
        Some("1") | Some("true") | Some("TRUE") | Some("yes") => true,
        Some("0") | Some("false") | Some("FALSE") | Some("no") => false,
        Some(_) | None => default,
    }
}

fn parse_enum<T: Copy>(
    env: &impl EnvSource,
    key: &'static str,
    default: T,
    warnings: &mut Vec<ConfigWarning>,
    parse: impl Fn(&str) -> Option<T>,
) -> T {
    let Some(raw) = env.get(key) else { return default };
    match parse(raw.trim()) {
        Some(v) => v,
        None => {
            warnings.push(ConfigWarning::new(key, format!("{raw:?} is not recognised, using default")));
            default
        }
    }
}

/// Detect whether we are running inside a container (Docker or Kubernetes).
pub fn detect_container_runtime() -> bool {
    if std::path::Path::new("/.dockerenv").exists() {
        return true;
    }
    match std::fs::read_to_string("/proc/1/cgroup") {
        Ok(contents) => contents.contains("docker") || contents.contains("kubepods"),
        Err(_) => false,
    }
}

const LOOPBACK_LITERALS: &[&str] = &["localhost", "127.0.0.1"];

fn resolve_agent_host(
    env: &impl EnvSource,
    container_detected: bool,
    warnings: &mut Vec<ConfigWarning>,
) -> String {
    let explicit = env.get("AGENT_WS_HOST");
    let default = if container_detected { "python-agent" } else { "127.0.0.1" };
    let host = explicit.unwrap_or_else(|| default.to_owned());

    if container_detected && LOOPBACK_LITERALS.contains(&host.as_str()) {
        warnings.push(ConfigWarning::new(
            "AGENT_WS_HOST",
            format!("{host:?} is a loopback literal under a detected container runtime, rewriting to \"python-agent\""),
        ));
        return "python-agent".to_owned();
    }
    host
}

impl Config {
    /// Resolve configuration from the given environment source, collecting warnings.
    pub fn from_env(env: &impl EnvSource) -> (Config, Vec<ConfigWarning>) {
        let mut warnings = Vec::new();
        let container_detected = detect_container_runtime();

        let agent_ws_url = env.get("AGENT_WS_URL").unwrap_or_else(|| {
            let host = resolve_agent_host(env, container_detected, &mut warnings);
            let port = env.get("AGENT_WS_PORT").and_then(|v| v.parse::<u16>().ok()).unwrap_or(9000);
            format!("ws://{host}:{port}")
        });

        let game_server = GameServerConfig {
            host: env.get("MC_HOST").unwrap_or_else(|| "localhost".to_owned()),
            port: env.get("MC_PORT").and_then(|v| v.parse().ok()).unwrap_or(25565),
            version: env.get("MC_VERSION"),
            reconnect_delay: Duration::from_millis(
                env.get("MC_RECONNECT_DELAY_MS").and_then(|v| v.parse().ok()).unwrap_or(5000),
            ),
            username: env.get("BOT_USERNAME").unwrap_or_else(|| "agent".to_owned()),
            auth_mode: parse_enum(env, "AUTH_MODE", AuthMode::Offline, &mut warnings, |s| match s {
                "offline" => Some(AuthMode::Offline),
                "microsoft" => Some(AuthMode::Microsoft),
                _ => None,
            }),
        };

        let router = RouterConfig {
            host: env.get("WS_HOST").unwrap_or_else(|| "0.0.0.0".to_owned()),
            port: env.get("WS_PORT").and_then(|v| v.parse().ok()).unwrap_or(8765),
        };

        let bridge = BridgeConfig {
            url: agent_ws_url,
            connect_timeout: Duration::from_millis(
                env.get("AGENT_WS_CONNECT_TIMEOUT_MS").and_then(|v| v.parse().ok()).unwrap_or(5000),
            ),
            send_timeout: Duration::from_millis(
                env.get("AGENT_WS_SEND_TIMEOUT_MS").and_then(|v| v.parse().ok()).unwrap_or(5000),
            ),
            healthcheck_interval: Duration::from_millis(
                env.get("AGENT_WS_HEALTHCHECK_INTERVAL_MS").and_then(|v| v.parse().ok()).unwrap_or(15000),
            ),
            reconnect_delay: Duration::from_millis(
                env.get("AGENT_WS_RECONNECT_DELAY_MS").and_then(|v| v.parse().ok()).unwrap_or(2000),
            ),
            max_retries: env.get("AGENT_WS_MAX_RETRIES").and_then(|v| v.parse().ok()).unwrap_or(3),
            batch_interval: Duration::from_millis(
                env.get("AGENT_EVENT_BATCH_INTERVAL_MS").and_then(|v| v.parse().ok()).unwrap_or(250),
            ),
            batch_max_size: env.get("AGENT_EVENT_BATCH_MAX_SIZE").and_then(|v| v.parse().ok()).unwrap_or(50),
            queue_max_size: env.get("AGENT_EVENT_QUEUE_MAX_SIZE").and_then(|v| v.parse().ok()).unwrap_or(1000),
        };

        let navigation = NavigationConfig {
            move_goal_tolerance: clamp_u32(env, "MOVE_GOAL_TOLERANCE", 1, 30, 3, &mut warnings),
            allow_parkour: parse_bool(env, "PATHFINDER_ALLOW_PARKOUR", true),
            allow_sprinting: parse_bool(env, "PATHFINDER_ALLOW_SPRINTING", true),
            dig_cost_enabled: env.get("PATHFINDER_DIG_COST_ENABLED").and_then(|v| v.parse().ok()).unwrap_or(1),
            dig_cost_disabled: env.get("PATHFINDER_DIG_COST_DISABLED").and_then(|v| v.parse().ok()).unwrap_or(96),
            forced_move_retry_window: Duration::from_millis(
                env.get("FORCED_MOVE_RETRY_WINDOW_MS").and_then(|v| v.parse().ok()).unwrap_or(2000),
            ),
            forced_move_max_retries: env.get("FORCED_MOVE_MAX_RETRIES").and_then(|v| v.parse().ok()).unwrap_or(2),
            forced_move_retry_delay: Duration::from_millis(
                env.get("FORCED_MOVE_RETRY_DELAY_MS").and_then(|v| v.parse().ok()).unwrap_or(300),
            ),
        };

        let playback = PlaybackConfig {
            control_mode: parse_enum(env, "CONTROL_MODE", ControlMode::Hybrid, &mut warnings, |s| match s {
                "command" => Some(ControlMode::Command),
                "vpt" => Some(ControlMode::Vpt),
                "hybrid" => Some(ControlMode::Hybrid),
                _ => None,
            }),
            tick_interval: Duration::from_millis(u64::from(clamp_u32(
                env,
                "VPT_TICK_INTERVAL_MS",
                10,
                250,
                50,
                &mut warnings,
            ))),
            max_sequence_length: clamp_u32(env, "VPT_MAX_SEQUENCE_LENGTH", 1, 2000, 240, &mut warnings) as usize,
        };

        let perception = PerceptionConfig {
            entity_radius: clamp_u32(env, "PERCEPTION_ENTITY_RADIUS", 1, 64, 12, &mut warnings),
            block_radius: clamp_u32(env, "PERCEPTION_BLOCK_RADIUS", 1, 16, 4, &mut warnings),
            block_height: clamp_u32(env, "PERCEPTION_BLOCK_HEIGHT", 1, 12, 2, &mut warnings),
            broadcast_interval: Duration::from_millis(u64::from(clamp_u32(
                env,
                "PERCEPTION_BROADCAST_INTERVAL_MS",
                250,
                30000,
                1500,
                &mut warnings,
            ))),
        };

        let sampler_ratio = env
            .get("OTEL_TRACES_SAMPLER_RATIO")
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .map(|v| v.clamp(0.0, 1.0))
            .unwrap_or_else(|| {
                if env.get("OTEL_TRACES_SAMPLER_RATIO").is_some() {
                    warnings.push(ConfigWarning::new(
                        "OTEL_TRACES_SAMPLER_RATIO",
                        "not a finite number in [0,1], using default 1.0",
                    ));
                }
                1.0
            });

        let telemetry = TelemetryConfig {
            otlp_endpoint: env.get("OTEL_EXPORTER_OTLP_ENDPOINT"),
            service_name: env.get("OTEL_SERVICE_NAME").unwrap_or_else(|| "botrelay".to_owned()),
            deployment_environment: env.get("OTEL_DEPLOYMENT_ENVIRONMENT").unwrap_or_else(|| "dev".to_owned()),
            sampler_ratio,
        };

        let skill_history_path = env
            .get("SKILL_HISTORY_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("var/skills/history.ndjson"));

        (
            Config {
                game_server,
                router,
                bridge,
                navigation,
                playback,
                perception,
                telemetry,
                skill_history_path,
            },
            warnings,
        )
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
