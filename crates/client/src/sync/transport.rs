// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction for the real-time channel.
//!
//! Provides a trait-based transport layer that enables:
//! - Real WebSocket connections for production
//! - Mock transports for unit testing
//!
//! The transport only moves bytes. It gives no delivery, ordering, or
//! deduplication guarantees; those concerns live in the layers above it.

use std::future::Future;
use std::pin::Pin;

use pv_core::MEDIA_TOPIC;

/// Boxed future returned by [`Transport`] methods.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Error type for transport operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection closed unexpectedly.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// The credential could not be attached to the connect request.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// A unit of data moving over the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Raw payload bytes.
    pub payload: Vec<u8>,
    /// Optional channel label. [`MEDIA_TOPIC`] marks raw media.
    pub topic: Option<String>,
}

impl Frame {
    /// Creates an untopiced frame carrying UTF-8 text.
    pub fn text(text: impl Into<String>) -> Self {
        Frame { payload: text.into().into_bytes(), topic: None }
    }

    /// Creates a frame with arbitrary bytes and topic.
    pub fn new(payload: impl Into<Vec<u8>>, topic: Option<String>) -> Self {
        Frame { payload: payload.into(), topic }
    }

    /// Creates a frame on the media topic.
    pub fn media(payload: impl Into<Vec<u8>>) -> Self {
        Frame { payload: payload.into(), topic: Some(MEDIA_TOPIC.to_string()) }
    }
}

/// Events reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The transport (re-)established its connection on its own.
    Connected,
    /// The connection was lost.
    Disconnected,
    /// The transport is retrying internally.
    Reconnecting { attempt: u32 },
    /// Inbound data.
    Data(Frame),
}

/// Transport trait for the bidirectional channel.
///
/// This trait abstracts over the actual transport mechanism, allowing
/// for easy testing with mock implementations.
pub trait Transport: Send {
    /// Connect to a remote endpoint.
    fn connect<'a>(
        &'a mut self,
        url: &'a str,
        credential: Option<&'a str>,
    ) -> TransportFuture<'a, TransportResult<()>>;

    /// Disconnect. Always succeeds locally.
    fn disconnect(&mut self) -> TransportFuture<'_, ()>;

    /// Send a frame.
    fn send(&mut self, frame: Frame) -> TransportFuture<'_, TransportResult<()>>;

    /// Wait for the next transport event.
    ///
    /// Must be cancel-safe: dropping the future before it completes loses
    /// no data.
    fn next_event(&mut self) -> TransportFuture<'_, TransportEvent>;

    /// Check if connected.
    fn is_connected(&self) -> bool;
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// WebSocket transport implementation using tokio-tungstenite.
///
/// Text frames carry JSON; binary frames are treated as media and surface
/// with the [`MEDIA_TOPIC`] topic.
pub struct WebSocketTransport {
    /// The WebSocket connection, if connected.
    ws: Option<WebSocketConnection>,
}

/// Internal WebSocket connection wrapper.
struct WebSocketConnection {
    sink: futures_util::stream::SplitSink<WsStream, tokio_tungstenite::tungstenite::Message>,
    stream: futures_util::stream::SplitStream<WsStream>,
}

impl WebSocketTransport {
    /// Create a new WebSocket transport.
    pub fn new() -> Self {
        WebSocketTransport { ws: None }
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for WebSocketTransport {
    fn connect<'a>(
        &'a mut self,
        url: &'a str,
        credential: Option<&'a str>,
    ) -> TransportFuture<'a, TransportResult<()>> {
        Box::pin(async move {
            use futures_util::StreamExt;
            use tokio_tungstenite::tungstenite::client::IntoClientRequest;
            use tokio_tungstenite::tungstenite::http::header::{HeaderValue, AUTHORIZATION};

            let mut request = url
                .into_client_request()
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

            if let Some(token) = credential {
                let value = HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|e| TransportError::InvalidCredential(e.to_string()))?;
                request.headers_mut().insert(AUTHORIZATION, value);
            }

            let (ws_stream, _) = tokio_tungstenite::connect_async(request)
                .await
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

            let (sink, stream) = ws_stream.split();
            self.ws = Some(WebSocketConnection { sink, stream });
            Ok(())
        })
    }

    fn disconnect(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            if let Some(mut ws) = self.ws.take() {
                use futures_util::SinkExt;
                if let Err(e) = ws.sink.close().await {
                    tracing::debug!("websocket close failed: {}", e);
                }
            }
        })
    }

    fn send(&mut self, frame: Frame) -> TransportFuture<'_, TransportResult<()>> {
        Box::pin(async move {
            use futures_util::SinkExt;
            use tokio_tungstenite::tungstenite::Message;

            let ws = self.ws.as_mut().ok_or(TransportError::ConnectionClosed)?;

            let is_media = frame.topic.as_deref() == Some(MEDIA_TOPIC);
            let message = match String::from_utf8(frame.payload) {
                Ok(text) if !is_media => Message::Text(text.into()),
                Ok(text) => Message::Binary(text.into_bytes().into()),
                Err(e) => Message::Binary(e.into_bytes().into()),
            };

            if let Err(e) = ws.sink.send(message).await {
                // Connection is broken, clear it
                self.ws = None;
                return Err(TransportError::SendFailed(e.to_string()));
            }

            // Flush to ensure the data is actually sent and we detect connection failures
            if let Err(e) = ws.sink.flush().await {
                self.ws = None;
                return Err(TransportError::SendFailed(e.to_string()));
            }

            Ok(())
        })
    }

    fn next_event(&mut self) -> TransportFuture<'_, TransportEvent> {
        Box::pin(async move {
            use futures_util::StreamExt;
            use tokio_tungstenite::tungstenite::Message;

            let Some(ws) = self.ws.as_mut() else {
                return TransportEvent::Disconnected;
            };

            loop {
                match ws.stream.next().await {
                    Some(Ok(Message::Text(text))) => {
                        return TransportEvent::Data(Frame::text(text.as_str()));
                    }
                    Some(Ok(Message::Binary(data))) => {
                        return TransportEvent::Data(Frame::media(data.to_vec()));
                    }
                    Some(Ok(Message::Close(_))) => {
                        // Connection closed, clear it
                        self.ws = None;
                        return TransportEvent::Disconnected;
                    }
                    Some(Ok(_)) => {
                        // Ignore ping/pong and raw frames, continue waiting
                        continue;
                    }
                    Some(Err(e)) => {
                        tracing::debug!("websocket receive failed: {}", e);
                        self.ws = None;
                        return TransportEvent::Disconnected;
                    }
                    None => {
                        // Stream ended, clear connection
                        self.ws = None;
                        return TransportEvent::Disconnected;
                    }
                }
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.ws.is_some()
    }
}
