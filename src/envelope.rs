// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire types for the Command channel and the Agent Event channel (spec §3).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// The closed set of inbound command verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Verb {
    Chat,
    MoveTo,
    EquipItem,
    GatherStatus,
    GatherVptObservation,
    MineOre,
    SetAgentRole,
    RegisterSkill,
    InvokeSkill,
    SkillExplore,
    PlayVptActions,
}

impl Verb {
    /// Matches the wire `type` string against the closed verb set, so an
    /// unrecognised verb can be told apart from malformed JSON (spec §4.3:
    /// "Invalid payload format" vs. "Unknown command type").
    pub fn from_wire(raw: &str) -> Option<Verb> {
        serde_json::from_value(Value::String(raw.to_owned())).ok()
    }
}

/// `{ type: Verb, args: map<string,any>, meta?: map<string,any> }`
#[derive(Debug, Clone, Deserialize)]
pub struct CommandEnvelope {
    #[serde(rename = "type")]
    pub verb: Verb,
    #[serde(default)]
    pub args: HashMap<String, Value>,
    #[serde(default)]
    pub meta: Option<HashMap<String, Value>>,
}

impl CommandEnvelope {
    /// Two-stage parse of a raw inbound frame: first as JSON, then as a
    /// known verb. Distinguishes "not JSON" / "not an envelope shape" from
    /// "well-formed envelope naming an unrecognised verb" (spec §4.3, §7).
    pub fn parse(raw: &str) -> Result<Self, crate::error::BotError> {
        let value: Value = serde_json::from_str(raw).map_err(|_| crate::error::BotError::InvalidPayload)?;
        let obj = value.as_object().ok_or(crate::error::BotError::InvalidPayload)?;
        let type_str = obj.get("type").and_then(Value::as_str).ok_or(crate::error::BotError::InvalidPayload)?;
        let verb = Verb::from_wire(type_str).ok_or(crate::error::BotError::UnknownCommand)?;
        let args = obj
            .get("args")
            .and_then(Value::as_object)
            .map(|m| m.clone().into_iter().collect())
            .unwrap_or_default();
        let meta = obj.get("meta").and_then(Value::as_object).map(|m| m.clone().into_iter().collect());
        Ok(Self { verb, args, meta })
    }
}

/// `{ ok: bool, error?: string, data?: any }`
#[derive(Debug, Clone, Serialize)]
pub struct CommandResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl CommandResponse {
    pub fn ok() -> Self {
        Self { ok: true, error: None, data: None }
    }

    pub fn ok_with(data: Value) -> Self {
        Self { ok: true, error: None, data: Some(data) }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self { ok: false, error: Some(message.into()), data: None }
    }
}

impl From<crate::error::BotError> for CommandResponse {
    fn from(err: crate::error::BotError) -> Self {
        CommandResponse::err(err.response_message())
    }
}

/// Agent Role (spec §3). Unrecognised input normalises to `Generalist`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Generalist,
    Defender,
    Supplier,
    Scout,
}

impl Default for AgentRole {
    fn default() -> Self {
        AgentRole::Generalist
    }
}

impl AgentRole {
    pub fn parse(raw: &str) -> AgentRole {
        match raw.to_ascii_lowercase().as_str() {
            "defender" => AgentRole::Defender,
            "supplier" => AgentRole::Supplier,
            "scout" => AgentRole::Scout,
            "generalist" => AgentRole::Generalist,
            _ => AgentRole::Generalist,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AgentRole::Generalist => "Generalist",
            AgentRole::Defender => "Defender",
            AgentRole::Supplier => "Supplier",
            AgentRole::Scout => "Scout",
        }
    }

    pub fn responsibilities(self) -> &'static [&'static str] {
        match self {
            AgentRole::Generalist => &["respond to planner commands", "no standing duties"],
            AgentRole::Defender => &["engage hostile entities near the party", "hold position under threat"],
            AgentRole::Supplier => &["gather and deliver requested resources", "maintain food and tool stock"],
            AgentRole::Scout => &["explore ahead of the party", "report hazards and points of interest"],
        }
    }
}

/// `{ channel: "multi-agent", event, agentId, timestamp, payload }`
#[derive(Debug, Clone, Serialize)]
pub struct AgentEvent {
    pub channel: &'static str,
    pub event: AgentEventKind,
    pub agent_id: String,
    pub timestamp: u64,
    pub payload: Value,
}

impl AgentEvent {
    pub fn new(event: AgentEventKind, agent_id: impl Into<String>, timestamp: u64, payload: Value) -> Self {
        Self { channel: "multi-agent", event, agent_id: agent_id.into(), timestamp, payload }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AgentEventKind {
    Position,
    Status,
    Perception,
    RoleUpdate,
}

/// `{ type: "agentEvent", args: { events: [...] } }`
#[derive(Debug, Clone, Serialize)]
pub struct PlannerEnvelope {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub args: PlannerEnvelopeArgs,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannerEnvelopeArgs {
    pub events: Vec<AgentEvent>,
}

impl PlannerEnvelope {
    pub fn batch(events: Vec<AgentEvent>) -> Self {
        Self { kind: "agentEvent", args: PlannerEnvelopeArgs { events } }
    }
}
