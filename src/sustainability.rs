// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sustainability Service (spec §4.8): hunger monitor invoked on game-client
//! "health" events. Cooldown-gate shape mirrors the teacher's
//! failure-count-then-act pattern in the health checker, applied to a
//! single warning cooldown instead of a retry counter.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tracing::{info, warn};

use crate::clock::unix_millis;
use crate::game_client::{GameClient, InventorySlot};

const STARVATION_FOOD_LEVEL: f64 = 6.0;

pub struct SustainabilityService {
    hunger_warning_cooldown: Duration,
    last_warning_at: AtomicU64,
    consuming: AtomicBool,
    food_names: Vec<String>,
}

impl SustainabilityService {
    pub fn new(hunger_warning_cooldown: Duration, food_names: Vec<String>) -> Self {
        Self { hunger_warning_cooldown, last_warning_at: AtomicU64::new(0), consuming: AtomicBool::new(false), food_names }
    }

    /// Invoked on the game client's "health" event (spec §4.8).
    pub async fn on_health_event(&self, client: &dyn GameClient) {
        let Some(food) = client.food_level() else { return };
        if food > STARVATION_FOOD_LEVEL {
            return;
        }
        if self.consuming.swap(true, Ordering::SeqCst) {
            return;
        }

        let outcome = self.try_consume(client).await;
        self.consuming.store(false, Ordering::SeqCst);

        match outcome {
            Ok(()) => info!("consumed food item to address hunger"),
            Err(()) => self.maybe_warn(client).await,
        }
    }

    async fn try_consume(&self, client: &dyn GameClient) -> Result<(), ()> {
        let slot = self.find_food(&client.inventory()).ok_or(())?;
        client.equip(&slot.name).await.map_err(|_| ())?;
        client.consume_held_item().await.map_err(|_| ())?;
        client.chat("ate something to stay fed").await;
        Ok(())
    }

    fn find_food<'a>(&self, inventory: &'a [InventorySlot]) -> Option<&'a InventorySlot> {
        inventory.iter().find(|slot| self.food_names.iter().any(|food| slot.name == *food))
    }

    async fn maybe_warn(&self, client: &dyn GameClient) {
        let now = unix_millis();
        let last = self.last_warning_at.load(Ordering::SeqCst);
        if now.saturating_sub(last) < self.hunger_warning_cooldown.as_millis() as u64 {
            return;
        }
        self.last_warning_at.store(now, Ordering::SeqCst);
        warn!("no food available, hunger warning issued");
        client.chat("I'm hungry and have nothing to eat").await;
    }
}

#[cfg(test)]
#[path = "sustainability_tests.rs"]
mod tests;
