// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session supervisor (spec §4.2 "Session supervisor" + "Healthcheck"):
//! owns the outbound duplex connection to the planner, its state machine,
//! and the liveness healthcheck. Grounded on the teacher's
//! `upstream/bridge.rs` `run_loop` (exponential-ish backoff reconnect over
//! `tokio::select!`), generalised from request/response correlation to a
//! plain batch send path.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{Mutex, Notify};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::clock::{unix_millis, Clock};
use crate::transport::{self, OutboundReader, OutboundWriter, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
}

pub struct SessionSupervisor {
    url: String,
    connect_timeout: Duration,
    healthcheck_interval: Duration,
    reconnect_delay: Duration,
    state: Mutex<SessionState>,
    writer: Mutex<Option<OutboundWriter>>,
    last_pong_ms: AtomicU64,
    connect_notify: Notify,
    cancel: CancellationToken,
}

impl SessionSupervisor {
    pub fn new(
        url: String,
        connect_timeout: Duration,
        healthcheck_interval: Duration,
        reconnect_delay: Duration,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            url,
            connect_timeout,
            healthcheck_interval,
            reconnect_delay,
            state: Mutex::new(SessionState::Disconnected),
            writer: Mutex::new(None),
            last_pong_ms: AtomicU64::new(0),
            connect_notify: Notify::new(),
            cancel,
        })
    }

    pub async fn state(&self) -> SessionState {
        *self.state.lock().await
    }

    /// `ensureSession(reason)` (spec §4.2): connects if not already
    /// connected/connecting. Idempotent.
    pub async fn ensure_session(self: &Arc<Self>, reason: &str) {
        {
            let mut state = self.state.lock().await;
            if *state != SessionState::Disconnected {
                return;
            }
            *state = SessionState::Connecting;
        }
        info!(reason, url = %self.url, "connecting to planner");

        let clock = Clock;
        let connected = clock.timeout(self.connect_timeout, transport::connect(&self.url)).await;
        match connected {
            Ok(Ok(transport)) => {
                let (writer, reader) = transport.split();
                *self.writer.lock().await = Some(writer);
                *self.state.lock().await = SessionState::Connected;
                self.last_pong_ms.store(unix_millis(), Ordering::SeqCst);
                self.connect_notify.notify_waiters();
                self.spawn_reader(reader);
                self.spawn_healthcheck();
                info!("connected to planner");
            }
            Ok(Err(err)) => self.handle_connect_failure(err.to_string()).await,
            Err(_) => self.handle_connect_failure("connect timed out".to_owned()).await,
        }
    }

    async fn handle_connect_failure(self: &Arc<Self>, reason: String) {
        warn!(reason, "planner connect failed");
        *self.state.lock().await = SessionState::Disconnected;
        self.connect_notify.notify_waiters();
        self.schedule_reconnect();
    }

    /// Drains inbound frames from the planner. This channel only ever
    /// carries liveness traffic (spec §4.2 "a probe response refreshes the
    /// pong timestamp"), so any frame that isn't a close counts as a pong;
    /// a close or read error terminates the session.
    fn spawn_reader(self: &Arc<Self>, mut reader: OutboundReader) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = this.cancel.cancelled() => return,
                    frame = reader.next() => {
                        match frame {
                            Some(Ok(Message::Close(_))) | None => {
                                this.terminate("planner closed connection").await;
                                return;
                            }
                            Some(Ok(_)) => this.record_pong(),
                            Some(Err(err)) => {
                                warn!(error = %err, "planner read failed");
                                this.terminate("planner read failed").await;
                                return;
                            }
                        }
                    }
                }
            }
        });
    }

    fn spawn_healthcheck(self: &Arc<Self>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let clock = Clock;
            let mut ticker = clock.interval(this.healthcheck_interval);
            loop {
                tokio::select! {
                    _ = this.cancel.cancelled() => return,
                    _ = ticker.tick() => {
                        if this.state().await != SessionState::Connected {
                            return;
                        }
                        let last_pong = this.last_pong_ms.load(Ordering::SeqCst);
                        let stale = unix_millis().saturating_sub(last_pong) > 2 * this.healthcheck_interval.as_millis() as u64;
                        if stale {
                            warn!("healthcheck missed, terminating session");
                            this.terminate("healthcheck timeout").await;
                            return;
                        }
                        this.send_probe().await;
                    }
                }
            }
        });
    }

    async fn send_probe(self: &Arc<Self>) {
        let mut guard = self.writer.lock().await;
        if let Some(writer) = guard.as_mut() {
            let probe = Message::Text(serde_json::json!({ "type": "ping" }).to_string().into());
            if writer.send(probe).await.is_err() {
                drop(guard);
                self.terminate("probe send failed").await;
            }
        }
    }

    /// Records a liveness response from the peer.
    pub fn record_pong(&self) {
        self.last_pong_ms.store(unix_millis(), Ordering::SeqCst);
    }

    /// Resolves the next time a connection attempt completes (successfully
    /// or not) — the flusher awaits this while waiting for a session.
    pub async fn notified(&self) {
        self.connect_notify.notified().await;
    }

    pub async fn send(&self, text: String) -> Result<(), TransportError> {
        let mut guard = self.writer.lock().await;
        match guard.as_mut() {
            Some(writer) => writer.send(Message::Text(text.into())).await.map_err(|e| TransportError::Io(e.to_string())),
            None => Err(TransportError::Closed),
        }
    }

    /// Terminates the current socket and transitions to `disconnected`,
    /// scheduling a reconnect. Safe to call when already disconnected.
    pub async fn terminate(self: &Arc<Self>, reason: &str) {
        let mut guard = self.writer.lock().await;
        if let Some(mut writer) = guard.take() {
            let _ = writer.close().await;
        }
        drop(guard);
        let was_connected = {
            let mut state = self.state.lock().await;
            let was = *state != SessionState::Disconnected;
            *state = SessionState::Disconnected;
            was
        };
        if was_connected {
            warn!(reason, "planner session terminated");
            self.schedule_reconnect();
        }
    }

    fn schedule_reconnect(self: &Arc<Self>) {
        let this = Arc::clone(self);
        let delay = self.reconnect_delay;
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = Clock.sleep(delay) => {
                    this.ensure_session("reconnect").await;
                }
            }
        });
    }
}
