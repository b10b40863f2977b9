// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end tests against a real `palaver-relay`.
//!
//! # Requirements
//!
//! The `palaver-relay` binary must be built and available in the same target
//! directory. Run `cargo build -p pv-relay` before running these tests.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use palaver::state::ConversationState;
use palaver::sync::{
    ConnectionState, Endpoint, Session, SessionConfig, TokioSleeper, Transport, TransportEvent,
    WebSocketTransport,
};
use pv_core::{MonotonicClock, OutboundCommand, Role};

/// Skip the test when the relay binary is not available.
macro_rules! require_relay {
    () => {
        match TestRelay::spawn() {
            Some(relay) => relay,
            None => {
                eprintln!(
                    "SKIPPED: palaver-relay binary not found. Run `cargo build -p pv-relay` first."
                );
                return;
            }
        }
    };
}

/// Returns timeout duration, longer for CI environments.
fn timeout() -> Duration {
    if std::env::var("CI").is_ok() {
        Duration::from_secs(30)
    } else {
        Duration::from_secs(5)
    }
}

/// Find the palaver-relay binary: `PALAVER_RELAY_BIN`, then the target
/// directory this test runs from.
fn find_relay() -> Option<PathBuf> {
    let binary_name = if cfg!(windows) { "palaver-relay.exe" } else { "palaver-relay" };

    if let Ok(path) = std::env::var("PALAVER_RELAY_BIN") {
        let binary_path = PathBuf::from(path);
        if binary_path.exists() {
            return Some(binary_path);
        }
    }

    // test_exe is at target/{debug,release}/deps/relay-*
    let test_exe = std::env::current_exe().ok()?;
    let profile_dir = test_exe.parent()?.parent()?;
    let binary_path = profile_dir.join(binary_name);
    binary_path.exists().then_some(binary_path)
}

/// A spawned relay, killed on drop.
struct TestRelay {
    child: Child,
    port: u16,
}

impl TestRelay {
    fn spawn() -> Option<Self> {
        let binary = find_relay()?;

        for attempt in 0..5 {
            let port = Self::random_port(attempt);
            if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)) {
                drop(listener);
                if let Ok(relay) = Self::try_spawn(&binary, port) {
                    return Some(relay);
                }
            }
        }
        panic!("palaver-relay found but failed to start after 5 port attempts");
    }

    fn try_spawn(binary: &Path, port: u16) -> Result<Self, std::io::Error> {
        let child = Command::new(binary)
            .arg("--bind")
            .arg(format!("127.0.0.1:{}", port))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(TestRelay { child, port })
    }

    /// A port in the ephemeral range.
    fn random_port(attempt: u32) -> u16 {
        let mut hasher = DefaultHasher::new();
        std::process::id().hash(&mut hasher);
        std::thread::current().id().hash(&mut hasher);
        Instant::now().hash(&mut hasher);
        attempt.hash(&mut hasher);
        49152 + (hasher.finish() % 16383) as u16
    }

    fn url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }

    async fn wait_ready(&self) {
        for _ in 0..50 {
            if tokio::net::TcpStream::connect(("127.0.0.1", self.port)).await.is_ok() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        panic!("relay did not become ready");
    }
}

impl Drop for TestRelay {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn session(relay: &TestRelay) -> Session<WebSocketTransport> {
    Session::new(
        WebSocketTransport::new(),
        SessionConfig::new(Endpoint::new(relay.url(), None)),
        Arc::new(MonotonicClock::new()),
        Arc::new(TokioSleeper),
    )
}

/// Step the session until `done` holds for its state.
async fn step_until(
    session: &mut Session<WebSocketTransport>,
    done: impl Fn(&ConversationState) -> bool,
) {
    tokio::time::timeout(timeout(), async {
        while !done(session.state()) {
            session.step().await;
        }
    })
    .await
    .expect("state never converged");
}

#[tokio::test]
async fn test_websocket_transport_connect_disconnect() {
    let relay = require_relay!();
    relay.wait_ready().await;

    let mut transport = WebSocketTransport::new();
    assert!(!transport.is_connected());

    transport.connect(&relay.url(), None).await.unwrap();
    assert!(transport.is_connected());

    transport.disconnect().await;
    assert!(!transport.is_connected());
}

#[tokio::test]
async fn test_websocket_transport_round_trip() {
    let relay = require_relay!();
    relay.wait_ready().await;

    let mut transport = WebSocketTransport::new();
    transport.connect(&relay.url(), Some("dev-token")).await.unwrap();
    let json = OutboundCommand::ListConversations.to_json().unwrap();
    transport.send(palaver::sync::Frame::text(json)).await.unwrap();

    let event = tokio::time::timeout(timeout(), transport.next_event()).await.unwrap();
    match event {
        TransportEvent::Data(frame) => {
            assert_eq!(frame.topic, None);
            let text = String::from_utf8(frame.payload).unwrap();
            assert!(text.contains("conversations_list"));
        }
        other => panic!("expected data, got {:?}", other),
    }
}

#[tokio::test]
async fn test_session_against_relay() {
    let relay = require_relay!();
    relay.wait_ready().await;

    let mut session = session(&relay);
    session.connect().await;
    assert_eq!(session.connection_state(), ConnectionState::Connected);

    // The relay answers and broadcasts the creation; the session applies it once.
    session.execute(&OutboundCommand::create("Trip")).await.unwrap();
    step_until(&mut session, |s| s.active_id().is_some() && s.summaries.len() == 1).await;
    let id = session.state().active_id().unwrap().to_string();

    // The echo of our own message is absorbed by the optimistic copy.
    session.send_user_message("hello").await.unwrap();
    step_until(&mut session, |s| {
        s.streaming.is_none() && s.active.as_ref().is_some_and(|a| a.messages.len() == 2)
    })
    .await;
    let active = session.state().active.clone().unwrap();
    assert_eq!(active.messages[0].role, Role::User);
    assert_eq!(active.messages[0].content, "hello");
    assert_eq!(active.messages[1].role, Role::Assistant);
    assert_eq!(active.messages[1].content, "You said: hello");

    session.rename(&id, "Road trip").await.unwrap();
    assert_eq!(session.state().active.as_ref().unwrap().title, "Road trip");
    assert_eq!(session.state().summary(&id).unwrap().title, "Road trip");

    session.disconnect().await;
    assert_eq!(session.connection_state(), ConnectionState::Disconnected);
}
