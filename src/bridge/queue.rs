// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded FIFO event queue (spec §4.2 "Queue"). Enqueue never blocks; the
//! queue evicts from the head on overflow and reports what it evicted so the
//! caller can warn with the evicted event's type.

use std::collections::VecDeque;

use tokio::sync::Mutex;

use crate::envelope::AgentEvent;

pub struct EventQueue {
    max_size: usize,
    items: Mutex<VecDeque<AgentEvent>>,
}

impl EventQueue {
    pub fn new(max_size: usize) -> Self {
        Self { max_size, items: Mutex::new(VecDeque::with_capacity(max_size.min(1024))) }
    }

    /// Pushes `event` onto the tail, evicting the head if the queue is full.
    /// Returns the evicted event, if any.
    pub async fn enqueue(&self, event: AgentEvent) -> Option<AgentEvent> {
        let mut items = self.items.lock().await;
        let evicted = if items.len() >= self.max_size { items.pop_front() } else { None };
        items.push_back(event);
        evicted
    }

    /// Removes and returns up to `n` events from the head, in FIFO order.
    pub async fn drain_up_to(&self, n: usize) -> Vec<AgentEvent> {
        let mut items = self.items.lock().await;
        let take = n.min(items.len());
        items.drain(..take).collect()
    }

    /// Prepends `events` back onto the head (failed-batch reinsertion,
    /// spec §4.2 "Flusher"), preserving their relative order. Returns the
    /// events dropped because capacity was exceeded, oldest-of-the-batch
    /// first.
    pub async fn reinsert_front(&self, events: Vec<AgentEvent>) -> Vec<AgentEvent> {
        let mut items = self.items.lock().await;
        let capacity_remaining = self.max_size.saturating_sub(items.len());
        let keep = events.len().min(capacity_remaining);
        let dropped = events[..events.len() - keep].to_vec();
        for event in events.into_iter().skip(events.len() - keep).rev() {
            items.push_front(event);
        }
        dropped
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
