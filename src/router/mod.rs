// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command Router (spec §4.3): a duplex listener on `WS_HOST:WS_PORT`.
//! Accepts inbound WebSocket sessions, assigns each an opaque client id, and
//! loops reading/writing frames through the `DuplexTransport` abstraction.
//! No authentication is performed at this layer. Shaped after the teacher's
//! `transport/ws.rs` per-connection handler.

pub mod dispatch;

use std::sync::Arc;

use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::game_client::GameClientFactory;
use crate::state::AppState;
use crate::transport::{DuplexTransport, WsTransport};

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "running" })
}

async fn ws_handler<F: GameClientFactory + 'static>(
    State(state): State<Arc<AppState<F>>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_session(state, socket))
}

/// Per-connection loop: read a frame, dispatch it, write exactly one
/// response, repeat until the peer closes (spec §4.3, §6 "one response per
/// request; no out-of-band messages").
async fn handle_session<F: GameClientFactory + 'static>(state: Arc<AppState<F>>, socket: axum::extract::ws::WebSocket) {
    let client_id = state.next_client_id();
    let mut transport = WsTransport::new(socket);
    tracing::info!(client_id, "command session opened");

    loop {
        tokio::select! {
            _ = state.cancel.cancelled() => break,
            frame = transport.recv() => {
                match frame {
                    Some(Ok(text)) => {
                        let response = dispatch::handle_frame(&state, client_id, &text).await;
                        if transport.send(response).await.is_err() {
                            break;
                        }
                    }
                    Some(Err(_)) | None => break,
                }
            }
        }
    }

    transport.close().await;
    tracing::info!(client_id, "command session closed");
}

/// Builds the axum `Router` for the Command Router (spec §4.3). `CorsLayer`
/// is permissive: the planner side authenticates at the bridge layer, not
/// via browser origin checks, matching the teacher's dashboard router.
pub fn build_router<F: GameClientFactory + 'static>(state: Arc<AppState<F>>) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/", get(ws_handler::<F>))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
