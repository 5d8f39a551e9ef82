// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Skill Registry & Logger (spec §4.9): in-memory registry of registered
//! skills plus an append-only newline-delimited JSON log mirroring every
//! registration/invocation, lazily prepared the first time it is needed.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::Utc;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::clock::unix_millis;
use crate::error::BotError;

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RegisteredSkill {
    pub id: String,
    pub title: String,
    pub description: String,
    pub steps: Vec<String>,
    pub tags: Vec<String>,
    pub created_at: u64,
}

pub struct SkillRegistry {
    skills: RwLock<HashMap<String, RegisteredSkill>>,
    history_path: PathBuf,
    log_ready: RwLock<bool>,
}

impl SkillRegistry {
    pub fn new(history_path: PathBuf) -> Self {
        Self { skills: RwLock::new(HashMap::new()), history_path, log_ready: RwLock::new(false) }
    }

    pub async fn register(
        &self,
        id: String,
        title: String,
        description: String,
        steps: Vec<String>,
        tags: Vec<String>,
    ) -> Result<(), BotError> {
        let id = id.trim().to_owned();
        let title = title.trim().to_owned();
        let description = description.trim().to_owned();
        let steps: Vec<String> = steps.into_iter().map(|s| s.trim().to_owned()).collect();

        if id.is_empty() || title.is_empty() || description.is_empty() || steps.is_empty() {
            return Err(BotError::InvalidSkill("id, title, description, and at least one step are required".to_owned()));
        }

        let skill = RegisteredSkill { id: id.clone(), title, description, steps, tags, created_at: unix_millis() };
        self.skills.write().await.insert(id.clone(), skill.clone());
        self.log_record("skill.register", json!({ "id": id, "title": skill.title })).await;
        Ok(())
    }

    pub async fn invoke(&self, id: &str, context: Option<Value>) -> Result<Vec<String>, BotError> {
        let skill = self.skills.read().await.get(id).cloned();
        match skill {
            None => {
                self.log_record("skill.invoke.missing", json!({ "id": id, "context": context })).await;
                Err(BotError::UnknownSkill(id.to_owned()))
            }
            Some(skill) => {
                self.log_record("skill.invoke", json!({ "id": id, "context": context })).await;
                Ok(skill.steps)
            }
        }
    }

    pub async fn explore(&self, id: &str, description: &str, context: Option<Value>) {
        self.log_record("skill.explore", json!({ "id": id, "description": description, "context": context })).await;
    }

    async fn log_record(&self, event: &str, context: Value) {
        let record = json!({
            "level": "info",
            "event": event,
            "timestamp": Utc::now().to_rfc3339(),
            "context": context,
        });
        info!(event, context = %record["context"], "skill event");
        self.append_to_history(&record).await;
    }

    async fn append_to_history(&self, record: &Value) {
        if !*self.log_ready.read().await {
            let mut ready = self.log_ready.write().await;
            if !*ready {
                if let Some(parent) = self.history_path.parent() {
                    if let Err(err) = tokio::fs::create_dir_all(parent).await {
                        warn!(error = %err, "failed to prepare skill history directory, continuing in-memory only");
                        return;
                    }
                }
                *ready = true;
            }
        }

        let line = format!("{}\n", record);
        match tokio::fs::OpenOptions::new().create(true).append(true).open(&self.history_path).await {
            Ok(mut file) => {
                if let Err(err) = file.write_all(line.as_bytes()).await {
                    warn!(error = %err, "failed to append skill history record");
                }
            }
            Err(err) => warn!(error = %err, "failed to open skill history file"),
        }
    }
}

#[cfg(test)]
#[path = "skills_tests.rs"]
mod tests;
