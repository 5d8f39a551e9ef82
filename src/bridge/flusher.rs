// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batch flusher (spec §4.2 "Flusher"): arms on enqueue, drains up to
//! `batchMaxSize` events, and sends them as one envelope with retries. New
//! composition of the teacher's retry/backoff idiom applied to batches
//! instead of request/response passthrough.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::envelope::PlannerEnvelope;
use crate::telemetry::Instruments;

use super::queue::EventQueue;
use super::session::{SessionState, SessionSupervisor};

pub struct BatchFlusher {
    queue: Arc<EventQueue>,
    session: Arc<SessionSupervisor>,
    instruments: Instruments,
    batch_max_size: usize,
    send_timeout: Duration,
    reconnect_delay: Duration,
    max_retries: u32,
    armed: AtomicBool,
    arm_signal: Notify,
    cancel: CancellationToken,
}

impl BatchFlusher {
    pub fn new(
        queue: Arc<EventQueue>,
        session: Arc<SessionSupervisor>,
        instruments: Instruments,
        batch_max_size: usize,
        send_timeout: Duration,
        reconnect_delay: Duration,
        max_retries: u32,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            queue,
            session,
            instruments,
            batch_max_size,
            send_timeout,
            reconnect_delay,
            max_retries,
            armed: AtomicBool::new(false),
            arm_signal: Notify::new(),
            cancel,
        })
    }

    /// Arms the flusher if it isn't already armed (spec §4.2 "Armed on
    /// enqueue if not already armed").
    pub fn arm(self: &Arc<Self>) {
        if !self.armed.swap(true, Ordering::SeqCst) {
            self.arm_signal.notify_one();
        }
    }

    /// Runs the flush loop until `cancel` fires. Spawned once by the bridge.
    pub async fn run(self: Arc<Self>) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = self.arm_signal.notified() => {}
            }
            self.drain_loop().await;
        }
    }

    async fn drain_loop(self: &Arc<Self>) {
        loop {
            if self.cancel.is_cancelled() {
                self.armed.store(false, Ordering::SeqCst);
                return;
            }
            if self.queue.is_empty().await {
                self.armed.store(false, Ordering::SeqCst);
                return;
            }
            if self.session.state().await != SessionState::Connected {
                self.session.ensure_session("flush").await;
                self.session.notified().await;
                continue;
            }

            let batch = self.queue.drain_up_to(self.batch_max_size).await;
            if batch.is_empty() {
                self.armed.store(false, Ordering::SeqCst);
                return;
            }
            self.send_with_retries(batch).await;
        }
    }

    async fn send_with_retries(self: &Arc<Self>, batch: Vec<crate::envelope::AgentEvent>) {
        let envelope = PlannerEnvelope::batch(batch.clone());
        let payload = match serde_json::to_string(&envelope) {
            Ok(p) => p,
            Err(err) => {
                warn!(error = %err, "failed to serialise agent event batch, dropping");
                return;
            }
        };

        let attempts_total = self.max_retries + 1;
        for attempt in 0..attempts_total {
            if self.session.state().await != SessionState::Connected {
                break;
            }
            let result = Clock.timeout(self.send_timeout, self.session.send(payload.clone())).await;
            match result {
                Ok(Ok(())) => {
                    for event in &batch {
                        self.instruments.agent_events_sent_total.record(
                            1,
                            &[opentelemetry::KeyValue::new("event", format!("{:?}", event.event))],
                        );
                    }
                    info!(count = batch.len(), attempt, "agent event batch sent");
                    return;
                }
                Ok(Err(err)) => {
                    warn!(error = %err, attempt, "agent event batch send failed");
                }
                Err(_) => {
                    warn!(attempt, "agent event batch send timed out");
                    self.session.terminate("send timeout").await;
                }
            }
            if attempt + 1 < attempts_total {
                Clock.sleep(self.reconnect_delay).await;
            }
        }

        let dropped = self.queue.reinsert_front(batch).await;
        for event in &dropped {
            self.instruments.queue_evictions_total.record(1, &[opentelemetry::KeyValue::new("event", format!("{:?}", event.event))]);
            warn!(event = ?event.event, "agent event dropped after exhausting retries and capacity");
        }
        self.session.ensure_session("flush retry exhausted").await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{AgentEvent, AgentEventKind};

    fn instruments() -> Instruments {
        let meter = opentelemetry::global::meter("test-flusher");
        Instruments {
            snapshot_build_duration: meter.f64_histogram("f1").build(),
            errors_total: meter.u64_counter("f2").build(),
            agent_events_sent_total: meter.u64_counter("f3").build(),
            queue_evictions_total: meter.u64_counter("f4").build(),
            queue_depth: meter.i64_up_down_counter("f5").build(),
        }
    }

    #[tokio::test]
    async fn arming_twice_only_notifies_once() {
        let queue = Arc::new(EventQueue::new(10));
        let session = SessionSupervisor::new(
            "ws://127.0.0.1:1".to_owned(),
            Duration::from_millis(10),
            Duration::from_secs(30),
            Duration::from_millis(10),
            CancellationToken::new(),
        );
        let flusher = BatchFlusher::new(queue.clone(), session, instruments(), 10, Duration::from_millis(10), Duration::from_millis(10), 0, CancellationToken::new());
        flusher.arm();
        flusher.arm();
        assert!(flusher.armed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn empty_queue_disarms_without_sending() {
        let queue = Arc::new(EventQueue::new(10));
        let session = SessionSupervisor::new(
            "ws://127.0.0.1:1".to_owned(),
            Duration::from_millis(10),
            Duration::from_secs(30),
            Duration::from_millis(10),
            CancellationToken::new(),
        );
        let flusher = BatchFlusher::new(queue, session, instruments(), 10, Duration::from_millis(10), Duration::from_millis(10), 0, CancellationToken::new());
        flusher.armed.store(true, Ordering::SeqCst);
        flusher.drain_loop().await;
        assert!(!flusher.armed.load(Ordering::SeqCst));
    }

    #[allow(dead_code)]
    fn sample_event() -> AgentEvent {
        AgentEvent::new(AgentEventKind::Status, "a1", 0, serde_json::json!({}))
    }
}
