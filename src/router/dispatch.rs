// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-frame dispatch (spec §4.3): parse, open a `command.<verb>` span,
//! delegate to the verb handler, record the outcome on the span.

use std::sync::Arc;

use tracing::{field, Instrument};

use crate::envelope::{CommandEnvelope, CommandResponse};
use crate::game_client::GameClientFactory;
use crate::handlers;
use crate::state::AppState;

/// Parses and dispatches one inbound frame, returning the JSON text to send
/// back on the same session.
pub async fn handle_frame<F: GameClientFactory + 'static>(state: &Arc<AppState<F>>, client_id: u64, raw: &str) -> String {
    let envelope = match CommandEnvelope::parse(raw) {
        Ok(env) => env,
        Err(err) => {
            let response: CommandResponse = err.into();
            return serde_json::to_string(&response)
                .unwrap_or_else(|_| "{\"ok\":false,\"error\":\"Invalid payload format\"}".to_owned());
        }
    };

    let verb_name = serde_json::to_value(envelope.verb).ok().and_then(|v| v.as_str().map(str::to_owned)).unwrap_or_default();
    let args_summary = envelope.args.keys().cloned().collect::<Vec<_>>().join(",");

    let span = tracing::info_span!(
        "command",
        verb = %verb_name,
        client_id,
        args = %args_summary,
        ok = field::Empty,
        error = field::Empty,
    );

    let args_value = serde_json::to_value(&envelope.args).unwrap_or(serde_json::Value::Object(Default::default()));
    let args_map = args_value.as_object().cloned().unwrap_or_default();

    async move {
        let response = handlers::dispatch(state, envelope.verb, args_map).await;
        tracing::Span::current().record("ok", response.ok);
        if !response.ok {
            tracing::Span::current().record("error", field::debug(&response.error));
        }
        serde_json::to_string(&response).unwrap_or_else(|_| "{\"ok\":false,\"error\":\"internal error\"}".to_owned())
    }
    .instrument(span)
    .await
}
