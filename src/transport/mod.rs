// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Duplex transport abstraction (Design Notes §9): the Command Router's
//! inbound WebSocket sessions and the Agent Event Bridge's outbound
//! connection to the planner both read and write line-delimited JSON over a
//! duplex byte stream. Modelling that shape as a trait lets both components,
//! and their tests, swap a real `tokio-tungstenite` socket for an in-memory
//! channel pair without touching call sites.

use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport closed")]
    Closed,
    #[error("transport error: {0}")]
    Io(String),
}

/// One side of a duplex text connection. `None` from `recv` means the peer
/// closed the connection; an `Err` means the transport itself failed.
#[allow(async_fn_in_trait)]
pub trait DuplexTransport: Send {
    async fn send(&mut self, text: String) -> Result<(), TransportError>;
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;
    async fn close(&mut self);
}

/// Inbound session transport: a live `axum` WebSocket, split into
/// send/receive halves by the caller.
pub struct WsTransport<S> {
    inner: S,
}

impl<S> WsTransport<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl DuplexTransport for WsTransport<axum::extract::ws::WebSocket> {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        use futures_util::SinkExt;
        self.inner
            .send(axum::extract::ws::Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        use futures_util::StreamExt;
        loop {
            return match self.inner.next().await? {
                Ok(axum::extract::ws::Message::Text(t)) => Some(Ok(t.to_string())),
                Ok(axum::extract::ws::Message::Close(_)) => None,
                Ok(_) => continue,
                Err(e) => Some(Err(TransportError::Io(e.to_string()))),
            };
        }
    }

    async fn close(&mut self) {
        use futures_util::SinkExt;
        let _ = self.inner.close().await;
    }
}

/// Outbound connection to the planner's WebSocket endpoint, used by the
/// Agent Event Bridge.
pub type OutboundStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

impl DuplexTransport for WsTransport<OutboundStream> {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        use futures_util::SinkExt;
        self.inner.send(Message::Text(text.into())).await.map_err(|e| TransportError::Io(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        use futures_util::StreamExt;
        loop {
            return match self.inner.next().await? {
                Ok(Message::Text(t)) => Some(Ok(t.to_string())),
                Ok(Message::Close(_)) => None,
                Ok(_) => continue,
                Err(e) => Some(Err(TransportError::Io(e.to_string()))),
            };
        }
    }

    async fn close(&mut self) {
        use futures_util::SinkExt;
        let _ = self.inner.close(None).await;
    }
}

/// Connects to `url`, returning a transport ready for the Agent Event
/// Bridge's session loop.
pub async fn connect(url: &str) -> Result<WsTransport<OutboundStream>, TransportError> {
    let (stream, _response) =
        tokio_tungstenite::connect_async(url).await.map_err(|e| TransportError::Io(e.to_string()))?;
    Ok(WsTransport::new(stream))
}

/// Write half of a split outbound connection.
pub type OutboundWriter = futures_util::stream::SplitSink<OutboundStream, Message>;
/// Read half of a split outbound connection.
pub type OutboundReader = futures_util::stream::SplitStream<OutboundStream>;

impl WsTransport<OutboundStream> {
    /// Splits the connection into independent write/read halves so a
    /// dedicated reader task can observe inbound frames (liveness pongs)
    /// concurrently with the session supervisor sending batches and probes,
    /// instead of both sharing one lock over the whole duplex stream.
    pub fn split(self) -> (OutboundWriter, OutboundReader) {
        use futures_util::StreamExt;
        self.inner.split()
    }
}

/// An in-memory duplex pair for tests: whatever is sent on one end arrives
/// on the other end's `recv`.
pub struct ChannelTransport {
    tx: tokio::sync::mpsc::UnboundedSender<String>,
    rx: tokio::sync::mpsc::UnboundedReceiver<String>,
    closed: bool,
}

impl ChannelTransport {
    pub fn pair() -> (ChannelTransport, ChannelTransport) {
        let (tx_a, rx_b) = tokio::sync::mpsc::unbounded_channel();
        let (tx_b, rx_a) = tokio::sync::mpsc::unbounded_channel();
        (
            ChannelTransport { tx: tx_a, rx: rx_a, closed: false },
            ChannelTransport { tx: tx_b, rx: rx_b, closed: false },
        )
    }
}

impl DuplexTransport for ChannelTransport {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.tx.send(text).map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        self.rx.recv().await.map(Ok)
    }

    async fn close(&mut self) {
        self.closed = true;
        self.rx.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_transport_roundtrips() {
        let (mut a, mut b) = ChannelTransport::pair();
        a.send("hello".to_owned()).await.unwrap();
        assert_eq!(b.recv().await.unwrap().unwrap(), "hello");
    }

    #[tokio::test]
    async fn closed_transport_rejects_send() {
        let (mut a, mut b) = ChannelTransport::pair();
        a.close().await;
        assert!(a.send("x".to_owned()).await.is_err());
        drop(a);
        assert!(b.recv().await.is_none());
    }
}
