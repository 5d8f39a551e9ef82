// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent Event Bridge (spec §4.2): durable, batched, reconnecting outbound
//! duplex channel to the planner. Wires the queue, batch flusher, and
//! session supervisor together, mirroring the teacher's `upstream/mod.rs`
//! module-grouping convention.

mod flusher;
mod queue;
mod session;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::BridgeConfig;
use crate::envelope::AgentEvent;
use crate::telemetry::Instruments;

pub use session::SessionState;

pub struct AgentEventBridge {
    queue: Arc<queue::EventQueue>,
    flusher: Arc<flusher::BatchFlusher>,
    session: Arc<session::SessionSupervisor>,
    instruments: Instruments,
}

impl AgentEventBridge {
    pub fn new(config: &BridgeConfig, instruments: Instruments, cancel: CancellationToken) -> Arc<Self> {
        let queue = Arc::new(queue::EventQueue::new(config.queue_max_size));
        let session = session::SessionSupervisor::new(
            config.url.clone(),
            config.connect_timeout,
            config.healthcheck_interval,
            config.reconnect_delay,
            cancel.clone(),
        );
        let flusher = flusher::BatchFlusher::new(
            queue.clone(),
            session.clone(),
            instruments.clone(),
            config.batch_max_size,
            config.send_timeout,
            config.reconnect_delay,
            config.max_retries,
            cancel,
        );
        Arc::new(Self { queue, flusher, session, instruments })
    }

    /// Spawns the background flush loop and kicks off the first connection
    /// attempt. Call once at process start.
    pub fn start(self: &Arc<Self>) {
        tokio::spawn(flusher::BatchFlusher::run(self.flusher.clone()));
        let session = self.session.clone();
        tokio::spawn(async move { session.ensure_session("startup").await });
    }

    /// Enqueues an event (spec §4.2 "Queue"). Arms the flusher and publishes
    /// the current queue depth.
    pub async fn enqueue(&self, event: AgentEvent) {
        if let Some(evicted) = self.queue.enqueue(event).await {
            self.instruments.queue_evictions_total.record(1, &[opentelemetry::KeyValue::new("event", format!("{:?}", evicted.event))]);
            tracing::warn!(event = ?evicted.event, "agent event queue full, evicted oldest");
        }
        self.instruments.queue_depth.add(self.queue.len().await as i64, &[]);
        self.flusher.arm();
    }

    pub async fn queue_len(&self) -> usize {
        self.queue.len().await
    }

    pub async fn session_state(&self) -> session::SessionState {
        self.session.state().await
    }
}

pub fn default_send_timeout() -> Duration {
    Duration::from_secs(5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::envelope::{AgentEvent, AgentEventKind};

    fn instruments() -> Instruments {
        let meter = opentelemetry::global::meter("test-bridge");
        Instruments {
            snapshot_build_duration: meter.f64_histogram("b1").build(),
            errors_total: meter.u64_counter("b2").build(),
            agent_events_sent_total: meter.u64_counter("b3").build(),
            queue_evictions_total: meter.u64_counter("b4").build(),
            queue_depth: meter.i64_up_down_counter("b5").build(),
        }
    }

    #[tokio::test]
    async fn enqueue_beyond_capacity_evicts_fifo_s4() {
        let (config, _) = Config::from_env(&crate::config::FakeEnv(
            [("AGENT_EVENT_QUEUE_MAX_SIZE".to_owned(), "3".to_owned())].into_iter().collect(),
        ));
        let bridge = AgentEventBridge::new(&config.bridge, instruments(), CancellationToken::new());

        for i in 1..=5 {
            bridge.enqueue(AgentEvent::new(AgentEventKind::Status, "a1", 0, serde_json::json!({ "n": i }))).await;
        }

        assert_eq!(bridge.queue_len().await, 3);
        let remaining = bridge.queue.drain_up_to(10).await;
        let values: Vec<_> = remaining.iter().map(|e| e.payload["n"].as_i64().unwrap()).collect();
        assert_eq!(values, vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn fresh_bridge_starts_disconnected() {
        let (config, _) = Config::from_env(&crate::config::FakeEnv::default());
        let bridge = AgentEventBridge::new(&config.bridge, instruments(), CancellationToken::new());
        assert_eq!(bridge.session_state().await, session::SessionState::Disconnected);
    }
}
