// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connection lifecycle supervision.
//!
//! The supervisor is the only code that calls [`Transport::connect`] and
//! [`Transport::disconnect`]. It is an explicit state machine:
//!
//! ```text
//!                 connect()             ok
//! Disconnected ─────────────► Connecting ─────► Connected
//!   ▲   ▲                         │ err            │ link lost
//!   │   │                         ▼                ▼
//!   │   │                     Reconnecting ◄───────┘
//!   │   │                      │        │ retry ok ──► Connected
//!   │   │ connect()            │ attempt > max_retries
//!   │   └──────────── Failed ◄─┘
//!   └──── disconnect() from any state
//! ```
//!
//! Reconnect waits are scheduled resumptions held in a [`PendingRetry`]:
//! the timer is created when a retry is scheduled and dropped on success,
//! on exhaustion, or on disconnect. Nothing here loops on its own; the
//! owner drives progress through [`ConnectionSupervisor::poll`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::backoff::BackoffPolicy;
use super::timer::{SleepFuture, Sleeper};
use super::transport::{Frame, Transport, TransportError, TransportEvent, TransportResult};

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected and not trying to be.
    Disconnected,
    /// First connection attempt in flight.
    Connecting,
    /// Connected to the remote endpoint.
    Connected,
    /// Connection lost; retrying under the backoff policy.
    Reconnecting,
    /// Retry budget exhausted. Stable until the next `connect()`.
    Failed,
}

impl ConnectionState {
    /// Returns the string representation used in logs and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Failed => "failed",
        }
    }

    /// True only for [`ConnectionState::Connected`].
    pub fn is_connected(&self) -> bool {
        *self == ConnectionState::Connected
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// State-changed notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    /// State after the change.
    pub state: ConnectionState,
    /// Reconnect attempt counter after the change.
    pub attempt: u32,
    /// Delay until the next scheduled reconnect attempt, if one is pending.
    pub retry_in: Option<Duration>,
}

/// What [`ConnectionSupervisor::poll`] observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Inbound data from the transport.
    Frame(Frame),
    /// The connection state (or attempt counter) changed.
    StateChanged(StateChange),
}

/// Where and how to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    pub credential: Option<String>,
}

impl Endpoint {
    /// Creates an endpoint.
    pub fn new(url: impl Into<String>, credential: Option<String>) -> Self {
        Endpoint { url: url.into(), credential }
    }
}

/// A scheduled reconnect attempt.
struct PendingRetry {
    delay: Duration,
    /// `None` once the wait elapsed; the connect attempt is then due.
    timer: Option<SleepFuture>,
}

/// Owns the transport and its connect/disconnect lifecycle.
pub struct ConnectionSupervisor<T: Transport> {
    transport: T,
    endpoint: Endpoint,
    policy: BackoffPolicy,
    sleeper: Arc<dyn Sleeper>,
    state: ConnectionState,
    attempt: u32,
    retry: Option<PendingRetry>,
    /// Session-wide cancellation. Interrupts every wait and connect attempt.
    shutdown: CancellationToken,
    notifier: broadcast::Sender<StateChange>,
}

impl<T: Transport> ConnectionSupervisor<T> {
    /// Create a supervisor in the `Disconnected` state.
    pub fn new(
        transport: T,
        endpoint: Endpoint,
        policy: BackoffPolicy,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        let (notifier, _) = broadcast::channel(64);
        ConnectionSupervisor {
            transport,
            endpoint,
            policy,
            sleeper,
            state: ConnectionState::Disconnected,
            attempt: 0,
            retry: None,
            shutdown: CancellationToken::new(),
            notifier,
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Get the reconnect attempt counter.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay of the currently scheduled retry, if any.
    pub fn pending_retry(&self) -> Option<Duration> {
        self.retry.as_ref().map(|r| r.delay)
    }

    /// Session-wide cancellation token.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Subscribe to state-changed notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.notifier.subscribe()
    }

    /// The reconnect policy in force.
    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Access the transport (for inspection in tests and diagnostics).
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Connect to the endpoint.
    ///
    /// A no-op while already connecting, connected, or reconnecting. From
    /// `Disconnected` or `Failed` it resets the attempt counter and makes
    /// one attempt; a failure hands over to the reconnect policy.
    pub async fn connect(&mut self) -> ConnectionState {
        if self.shutdown.is_cancelled() {
            tracing::warn!("connect ignored: session is shut down");
            return self.state;
        }

        match self.state {
            ConnectionState::Connecting
            | ConnectionState::Connected
            | ConnectionState::Reconnecting => {
                tracing::debug!("connect ignored while {}", self.state);
                return self.state;
            }
            ConnectionState::Disconnected | ConnectionState::Failed => {}
        }

        self.attempt = 0;
        self.retry = None;
        self.set_state(ConnectionState::Connecting);

        match self.try_connect().await {
            None => {
                self.disconnect().await;
            }
            Some(Ok(())) => {
                self.on_connected();
            }
            Some(Err(e)) => {
                tracing::warn!("connect to {} failed: {}", self.endpoint.url, e);
                self.schedule_retry();
            }
        }

        self.state
    }

    /// Disconnect from any state.
    ///
    /// Cancels any pending reconnect timer and reports `Disconnected`
    /// before the transport finishes closing. Always succeeds locally.
    pub async fn disconnect(&mut self) -> StateChange {
        self.retry = None;
        self.attempt = 0;
        let change = self.set_state(ConnectionState::Disconnected);
        self.transport.disconnect().await;
        change
    }

    /// Send a frame if connected.
    ///
    /// A failure that leaves the transport disconnected moves the
    /// supervisor to `Reconnecting`.
    pub async fn send(&mut self, frame: Frame) -> TransportResult<()> {
        if !self.state.is_connected() {
            return Err(TransportError::ConnectionClosed);
        }

        let result = self.transport.send(frame).await;
        if result.is_err() && !self.transport.is_connected() {
            self.on_link_lost();
        }
        result
    }

    /// Wait for the next thing that happens on the link.
    ///
    /// While connected this yields inbound frames and transport-reported
    /// state changes. While reconnecting it waits out the pending retry
    /// and makes the next attempt. In stable states it never completes.
    ///
    /// Cancel-safe: dropping the future keeps the pending retry; an
    /// interrupted connect attempt is repeated on the next call.
    pub async fn poll(&mut self) -> LinkEvent {
        loop {
            match self.state {
                ConnectionState::Connected => match self.transport.next_event().await {
                    TransportEvent::Data(frame) => return LinkEvent::Frame(frame),
                    TransportEvent::Disconnected => {
                        return LinkEvent::StateChanged(self.on_link_lost());
                    }
                    TransportEvent::Reconnecting { attempt } => {
                        // The transport retries on its own; mirror it.
                        self.attempt = attempt;
                        return LinkEvent::StateChanged(
                            self.set_state(ConnectionState::Reconnecting),
                        );
                    }
                    TransportEvent::Connected => continue,
                },
                ConnectionState::Reconnecting if self.retry.is_none() => {
                    match self.transport.next_event().await {
                        TransportEvent::Data(frame) => return LinkEvent::Frame(frame),
                        TransportEvent::Connected => {
                            return LinkEvent::StateChanged(self.on_connected());
                        }
                        TransportEvent::Reconnecting { attempt } => {
                            self.attempt = attempt;
                            return LinkEvent::StateChanged(
                                self.set_state(ConnectionState::Reconnecting),
                            );
                        }
                        TransportEvent::Disconnected => {
                            // The transport gave up; continue under our policy.
                            return LinkEvent::StateChanged(self.schedule_retry());
                        }
                    }
                }
                ConnectionState::Reconnecting => {
                    return LinkEvent::StateChanged(self.run_retry().await);
                }
                ConnectionState::Disconnected
                | ConnectionState::Connecting
                | ConnectionState::Failed => std::future::pending::<()>().await,
            }
        }
    }

    /// Wait out the pending retry, then make one connect attempt.
    async fn run_retry(&mut self) -> StateChange {
        let shutdown = self.shutdown.clone();

        let cancelled = match self.retry.as_mut().and_then(|r| r.timer.as_mut()) {
            Some(timer) => tokio::select! {
                _ = shutdown.cancelled() => true,
                _ = timer => false,
            },
            None => false,
        };
        if cancelled {
            return self.disconnect().await;
        }
        if let Some(retry) = self.retry.as_mut() {
            retry.timer = None;
        }

        tracing::debug!("reconnect attempt {} to {}", self.attempt, self.endpoint.url);
        match self.try_connect().await {
            None => self.disconnect().await,
            Some(Ok(())) => self.on_connected(),
            Some(Err(e)) => {
                tracing::warn!("reconnect attempt {} failed: {}", self.attempt, e);
                self.retry = None;
                self.schedule_retry()
            }
        }
    }

    /// One connect attempt. `None` means the session was shut down.
    async fn try_connect(&mut self) -> Option<TransportResult<()>> {
        let shutdown = self.shutdown.clone();
        tokio::select! {
            _ = shutdown.cancelled() => None,
            result = self.transport.connect(&self.endpoint.url, self.endpoint.credential.as_deref()) => Some(result),
        }
    }

    fn on_connected(&mut self) -> StateChange {
        self.attempt = 0;
        self.retry = None;
        self.set_state(ConnectionState::Connected)
    }

    fn on_link_lost(&mut self) -> StateChange {
        tracing::info!("connection to {} lost", self.endpoint.url);
        self.attempt = 0;
        self.schedule_retry()
    }

    /// Count an attempt and either schedule its timer or give up.
    fn schedule_retry(&mut self) -> StateChange {
        self.attempt = self.attempt.saturating_add(1);

        if self.policy.is_exhausted(self.attempt) {
            self.retry = None;
            tracing::warn!(
                "giving up on {} after {} reconnect attempts",
                self.endpoint.url,
                self.policy.max_retries
            );
            return self.set_state(ConnectionState::Failed);
        }

        let delay = self.policy.delay_for_attempt(self.attempt);
        self.retry = Some(PendingRetry { delay, timer: Some(self.sleeper.sleep(delay)) });
        self.set_state(ConnectionState::Reconnecting)
    }

    fn set_state(&mut self, state: ConnectionState) -> StateChange {
        if state != self.state {
            tracing::info!("connection {} -> {}", self.state, state);
        }
        self.state = state;

        let change = StateChange { state, attempt: self.attempt, retry_in: self.pending_retry() };
        // Nobody listening is fine.
        let _ = self.notifier.send(change.clone());
        change
    }
}
