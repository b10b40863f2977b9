// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Test server utilities and relay tests.
//!
//! Provides a TestServer on a random port plus a small WebSocket client.

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use pv_core::{ManualClock, OutboundCommand, Role, ServerMessage};

use crate::server::{self, handle_client_message};
use crate::state::{RelayState, DEFAULT_TITLE};

/// A test server that runs on a random port.
struct TestServer {
    addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
}

impl TestServer {
    async fn start() -> Self {
        let state = RelayState::with_clock(Arc::new(ManualClock::new(1_700_000_000_000)));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            tokio::select! {
                result = accept_loop(listener, state) => {
                    if let Err(e) = result {
                        eprintln!("Test server error: {}", e);
                    }
                }
                _ = shutdown_rx => {}
            }
        });

        TestServer { addr, shutdown_tx }
    }

    fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
    }
}

async fn accept_loop(
    listener: TcpListener,
    state: RelayState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let state = state.clone();
        tokio::spawn(async move {
            let _ = server::handle_connection(stream, peer_addr, state).await;
        });
    }
}

struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    async fn connect(server: &TestServer) -> Self {
        let (ws, _) = connect_async(server.ws_url()).await.unwrap();
        TestClient { ws }
    }

    async fn send(&mut self, command: &OutboundCommand) {
        self.ws.send(WsMessage::Text(command.to_json().unwrap().into())).await.unwrap();
    }

    async fn send_raw(&mut self, text: &str) {
        self.ws.send(WsMessage::Text(text.to_string().into())).await.unwrap();
    }

    async fn recv(&mut self) -> ServerMessage {
        let next = tokio::time::timeout(Duration::from_secs(5), self.ws.next()).await.unwrap();
        match next {
            Some(Ok(WsMessage::Text(text))) => ServerMessage::from_json(text.as_str()).unwrap(),
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    /// Receive until a message matches, returning everything seen.
    async fn recv_until(&mut self, done: impl Fn(&ServerMessage) -> bool) -> Vec<ServerMessage> {
        let mut seen = Vec::new();
        loop {
            let msg = self.recv().await;
            let stop = done(&msg);
            seen.push(msg);
            if stop {
                return seen;
            }
        }
    }
}

fn state() -> RelayState {
    RelayState::with_clock(Arc::new(ManualClock::new(1_700_000_000_000)))
}

#[tokio::test]
async fn test_list_starts_empty() {
    let dispatch = handle_client_message(r#"{"type":"list_conversations"}"#, &state()).await;
    assert_eq!(dispatch.direct, vec![ServerMessage::conversations_list(vec![])]);
    assert!(dispatch.broadcast.is_empty());
}

#[tokio::test]
async fn test_create_is_answered_and_broadcast() {
    let state = state();
    let json = OutboundCommand::create("Trip").to_json().unwrap();
    let dispatch = handle_client_message(&json, &state).await;
    assert_eq!(dispatch.direct, vec![ServerMessage::created("conv-1")]);
    assert_eq!(dispatch.broadcast, dispatch.direct);

    let list = state.list().await;
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].title, "Trip");
}

#[tokio::test]
async fn test_blank_title_gets_default() {
    let state = state();
    let id = state.create("   ").await.unwrap();
    assert_eq!(state.get(&id).await.unwrap().title, DEFAULT_TITLE);
}

#[tokio::test]
async fn test_rename_unknown_is_error() {
    let json = OutboundCommand::rename("conv-9", "x").to_json().unwrap();
    let dispatch = handle_client_message(&json, &state()).await;
    assert_eq!(dispatch.direct, vec![ServerMessage::error("conversation not found: conv-9")]);
    assert!(dispatch.broadcast.is_empty());
}

#[tokio::test]
async fn test_rename_trims_title() {
    let state = state();
    let id = state.create("Trip").await.unwrap();
    let json = OutboundCommand::rename(id.clone(), "  Road trip ").to_json().unwrap();
    let dispatch = handle_client_message(&json, &state).await;
    assert_eq!(dispatch.direct, vec![ServerMessage::renamed(id.clone(), "Road trip")]);
    assert_eq!(state.get(&id).await.unwrap().title, "Road trip");
}

#[tokio::test]
async fn test_malformed_frame_gets_error() {
    let dispatch = handle_client_message("not json", &state()).await;
    assert!(matches!(
        dispatch.direct.as_slice(),
        [ServerMessage::Error { message }] if message.starts_with("malformed command")
    ));
}

#[tokio::test]
async fn test_delete_names_replacement() {
    let state = state();
    let first = state.create("a").await.unwrap();
    let second = state.create("b").await.unwrap();

    let json = OutboundCommand::delete(second.clone()).to_json().unwrap();
    let dispatch = handle_client_message(&json, &state).await;
    assert_eq!(dispatch.direct, vec![ServerMessage::deleted(second, Some(first.clone()))]);

    let json = OutboundCommand::delete(first.clone()).to_json().unwrap();
    let dispatch = handle_client_message(&json, &state).await;
    assert_eq!(dispatch.direct, vec![ServerMessage::deleted(first, None)]);
}

#[tokio::test]
async fn test_clear_starts_fresh_conversation() {
    let state = state();
    state.create("a").await.unwrap();
    state.create("b").await.unwrap();

    let dispatch = handle_client_message(r#"{"type":"clear_all_conversations"}"#, &state).await;
    assert_eq!(dispatch.direct, vec![ServerMessage::cleared(Some("conv-3".into()))]);
    let list = state.list().await;
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].id, "conv-3");
}

#[tokio::test]
async fn test_user_message_echoes_then_streams() {
    let state = state();
    let json = OutboundCommand::user_message("hi there", None).to_json().unwrap();
    let dispatch = handle_client_message(&json, &state).await;
    assert!(dispatch.direct.is_empty());

    let (echo, chunks) = dispatch.broadcast.split_first().unwrap();
    match echo {
        ServerMessage::Message { message } => {
            assert_eq!(message.role, Role::User);
            assert_eq!(message.content, "hi there");
            assert_eq!(message.conversation_id, "conv-1");
        }
        other => panic!("expected echo, got {:?}", other),
    }

    let mut text = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        match chunk {
            ServerMessage::AssistantText { text: part, done, message_id, .. } => {
                assert_eq!(*done, i == chunks.len() - 1);
                assert_eq!(message_id.as_deref(), Some("msg-2"));
                text.push_str(part);
            }
            other => panic!("expected chunk, got {:?}", other),
        }
    }
    assert_eq!(text, "You said: hi there");

    let detail = state.get("conv-1").await.unwrap();
    assert_eq!(detail.messages.len(), 2);
}

#[tokio::test]
async fn test_user_message_to_unknown_conversation() {
    let json = OutboundCommand::user_message("hi", Some("conv-7".into())).to_json().unwrap();
    let dispatch = handle_client_message(&json, &state()).await;
    assert_eq!(dispatch.direct, vec![ServerMessage::error("conversation not found: conv-7")]);
    assert!(dispatch.broadcast.is_empty());
}

#[tokio::test]
async fn test_empty_user_message_is_error() {
    let json = OutboundCommand::user_message("  ", None).to_json().unwrap();
    let dispatch = handle_client_message(&json, &state()).await;
    assert_eq!(dispatch.direct, vec![ServerMessage::error("message text cannot be empty")]);
}

#[tokio::test]
async fn test_mutation_reaches_requester_twice() {
    let server = TestServer::start().await;
    let mut alice = TestClient::connect(&server).await;
    let mut bob = TestClient::connect(&server).await;

    // Bob's round trip proves his broadcast subscription is live.
    bob.send(&OutboundCommand::ListConversations).await;
    assert_eq!(bob.recv().await, ServerMessage::conversations_list(vec![]));

    alice.send(&OutboundCommand::create("Trip")).await;
    assert_eq!(alice.recv().await, ServerMessage::created("conv-1"));
    assert_eq!(alice.recv().await, ServerMessage::created("conv-1"));
    assert_eq!(bob.recv().await, ServerMessage::created("conv-1"));

    server.shutdown();
}

#[tokio::test]
async fn test_conversation_round_trip_over_socket() {
    let server = TestServer::start().await;
    let mut client = TestClient::connect(&server).await;

    client.send(&OutboundCommand::user_message("hello", None)).await;
    let seen = client
        .recv_until(|m| matches!(m, ServerMessage::AssistantText { done: true, .. }))
        .await;
    assert!(matches!(&seen[0], ServerMessage::Message { message } if message.content == "hello"));

    client.send(&OutboundCommand::get("conv-1")).await;
    match client.recv().await {
        ServerMessage::ConversationData { conversation } => {
            assert_eq!(conversation.messages.len(), 2);
            assert_eq!(conversation.messages[1].content, "You said: hello");
        }
        other => panic!("expected conversation_data, got {:?}", other),
    }

    client.send_raw(r#"{"type":"teleport"}"#).await;
    assert!(matches!(client.recv().await, ServerMessage::Error { .. }));

    server.shutdown();
}
