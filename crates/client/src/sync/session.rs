// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The session event loop.
//!
//! A [`Session`] owns one of each sync component and runs them on a single
//! task, so conversation state is never mutated in parallel:
//!
//! ```text
//! commands ──► ReliablePublisher ──► ConnectionSupervisor ──► Transport
//!                                                                │
//! updates ◄── reduce ◄── Deduplicator ◄── InboundRouter ◄────────┘
//! ```
//!
//! Reducer effects are published right away. A publish that fails is
//! reported as [`SessionUpdate::PublishFailed`] and never retried here.

use std::sync::Arc;

use pv_core::{timestamp_from_ms, ClockSource, Message, OutboundCommand, Role};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::backoff::BackoffPolicy;
use super::dedup::{DedupPolicy, Deduplicator, Signature};
use super::publisher::{PublishError, PublishFailureKind, PublishPolicy, ReliablePublisher};
use super::router::{InboundEvent, InboundRouter, MediaChunk};
use super::supervisor::{ConnectionState, ConnectionSupervisor, Endpoint, LinkEvent, StateChange};
use super::timer::Sleeper;
use super::transport::{Frame, Transport};
use crate::error::{Error, Result};
use crate::state::{reduce, ConversationState, Input, LocalAction};

/// Everything a session needs besides its transport, clock and timer.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub endpoint: Endpoint,
    pub reconnect: BackoffPolicy,
    pub publish: PublishPolicy,
    pub dedup: DedupPolicy,
    pub media_topic: String,
}

impl SessionConfig {
    /// Default policies for `endpoint`.
    pub fn new(endpoint: Endpoint) -> Self {
        SessionConfig {
            endpoint,
            reconnect: BackoffPolicy::default(),
            publish: PublishPolicy::default(),
            dedup: DedupPolicy::default(),
            media_topic: pv_core::MEDIA_TOPIC.to_string(),
        }
    }
}

/// Requests accepted by a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Connect,
    Disconnect,
    /// Publish a command as-is.
    Execute(OutboundCommand),
    /// Send a user message to the active conversation, optimistically.
    SendUserMessage(String),
    /// Rename a conversation, optimistically.
    Rename { id: String, title: String },
}

/// What a session reports to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// Connection state changed.
    Connection(StateChange),
    /// Conversation state after a change.
    Conversation(ConversationState),
    /// Media for the playback path.
    Media(MediaChunk),
    /// A command could not be published.
    PublishFailed { command: &'static str, kind: PublishFailureKind, reason: String },
}

/// One client session.
pub struct Session<T: Transport> {
    link: ConnectionSupervisor<T>,
    link_changes: broadcast::Receiver<StateChange>,
    publisher: ReliablePublisher,
    router: InboundRouter,
    dedup: Deduplicator,
    clock: Arc<dyn ClockSource>,
    state: ConversationState,
    updates: broadcast::Sender<SessionUpdate>,
    shutdown: CancellationToken,
    next_local_id: u64,
}

impl<T: Transport> Session<T> {
    /// Build a session. Nothing happens until [`Session::connect`].
    pub fn new(
        transport: T,
        config: SessionConfig,
        clock: Arc<dyn ClockSource>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        let shutdown = CancellationToken::new();
        let link =
            ConnectionSupervisor::new(transport, config.endpoint, config.reconnect, sleeper.clone())
                .with_shutdown(shutdown.clone());
        let link_changes = link.subscribe();
        let (updates, _) = broadcast::channel(256);

        Session {
            link,
            link_changes,
            publisher: ReliablePublisher::new(config.publish, sleeper),
            router: InboundRouter::new(config.media_topic),
            dedup: Deduplicator::new(clock.clone(), config.dedup),
            clock,
            state: ConversationState::default(),
            updates,
            shutdown,
            next_local_id: 0,
        }
    }

    /// Current conversation state.
    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.link.state()
    }

    /// Subscribe to session updates.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.updates.subscribe()
    }

    /// The supervised link.
    pub fn link(&self) -> &ConnectionSupervisor<T> {
        &self.link
    }

    /// Connect, then request the conversation list once connected.
    pub async fn connect(&mut self) {
        self.link.connect().await;
        self.sync_connection().await;
    }

    /// Disconnect and cancel any pending reconnect.
    pub async fn disconnect(&mut self) {
        self.link.disconnect().await;
        self.sync_connection().await;
    }

    /// Publish a command without touching local state.
    pub async fn execute(&mut self, command: &OutboundCommand) -> std::result::Result<(), PublishError> {
        let result = self.publisher.publish_command(&mut self.link, command).await;
        self.sync_connection().await;
        result
    }

    /// Send a user message and append it locally before the server echoes it.
    ///
    /// Local state is only touched once the publish succeeded.
    pub async fn send_user_message(&mut self, text: &str) -> std::result::Result<(), PublishError> {
        let conversation_id = self.state.active_id().map(str::to_string);
        let command = OutboundCommand::user_message(text, conversation_id.clone());
        self.execute(&command).await?;

        let Some(conversation_id) = conversation_id else {
            return Ok(());
        };
        // The server echo will carry the same signature.
        self.dedup.record(&Signature::user_message(&conversation_id, text));

        let message = Message::new(
            self.local_id(),
            conversation_id,
            Role::User,
            text,
            timestamp_from_ms(self.clock.now_ms()).unwrap_or_default(),
        );
        self.apply(Input::Local(LocalAction::SendUserMessage { message })).await;
        Ok(())
    }

    /// Rename a conversation and apply the new title locally.
    ///
    /// The title is trimmed, as the service stores it.
    pub async fn rename(&mut self, id: &str, title: &str) -> std::result::Result<(), PublishError> {
        let title = title.trim();
        self.execute(&OutboundCommand::rename(id, title)).await?;
        self.dedup.record(&Signature::renamed(id, title));
        self.apply(Input::Local(LocalAction::RenameConversation {
            id: id.to_string(),
            title: title.to_string(),
        }))
        .await;
        Ok(())
    }

    /// Wait for one link event and process it.
    pub async fn step(&mut self) {
        let event = self.link.poll().await;
        self.handle_link_event(event).await;
    }

    /// Process an event obtained from the link.
    pub async fn handle_link_event(&mut self, event: LinkEvent) {
        if let LinkEvent::Frame(frame) = event {
            self.handle_frame(&frame).await;
        }
        self.sync_connection().await;
    }

    /// Route, deduplicate and reduce one inbound frame.
    pub async fn handle_frame(&mut self, frame: &Frame) {
        let Some(event) = self.router.route(frame) else {
            return;
        };

        if let InboundEvent::AssistantMediaChunk(chunk) = event {
            let _ = self.updates.send(SessionUpdate::Media(chunk));
            return;
        }

        if let Some(signature) = Signature::for_event(&event) {
            if self.dedup.check_and_record(&signature) {
                tracing::debug!("suppressed duplicate {}", event.kind());
                return;
            }
        }

        self.apply(Input::Inbound(event)).await;
    }

    /// Run the reducer, then publish its effects.
    async fn apply(&mut self, input: Input) {
        let previous = self.state.clone();
        let (next, effects) = reduce(std::mem::take(&mut self.state), &input);
        self.state = next;

        if self.state != previous {
            let _ = self.updates.send(SessionUpdate::Conversation(self.state.clone()));
        }

        for command in effects {
            if let Err(e) = self.publisher.publish_command(&mut self.link, &command).await {
                self.report_failure(command.kind(), &e);
                if let OutboundCommand::GetConversation { conversation_id } = command {
                    self.settle(LocalAction::RequestFailed { id: conversation_id });
                }
            }
        }
    }

    /// Apply a bookkeeping action. These never produce commands.
    fn settle(&mut self, action: LocalAction) {
        let previous = self.state.clone();
        let (next, _) = reduce(std::mem::take(&mut self.state), &Input::Local(action));
        self.state = next;
        if self.state != previous {
            let _ = self.updates.send(SessionUpdate::Conversation(self.state.clone()));
        }
    }

    /// Forward link notifications; list conversations after (re)connecting.
    async fn sync_connection(&mut self) {
        let mut connected = false;
        loop {
            match self.link_changes.try_recv() {
                Ok(change) => {
                    connected |= change.state == ConnectionState::Connected;
                    let _ = self.updates.send(SessionUpdate::Connection(change));
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::debug!("skipped {} connection notifications", skipped);
                }
                Err(_) => break,
            }
        }

        if connected {
            self.settle(LocalAction::LinkRestored);
        }
        if connected && self.link.state().is_connected() {
            let command = OutboundCommand::ListConversations;
            if let Err(e) = self.publisher.publish_command(&mut self.link, &command).await {
                self.report_failure(command.kind(), &e);
            }
        }
    }

    fn report_failure(&self, command: &'static str, error: &PublishError) {
        tracing::warn!("failed to publish {}: {}", command, error);
        let _ = self.updates.send(SessionUpdate::PublishFailed {
            command,
            kind: error.kind(),
            reason: error.to_string(),
        });
    }

    fn local_id(&mut self) -> String {
        self.next_local_id += 1;
        format!("local-{}", self.next_local_id)
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        let (kind, result) = match command {
            SessionCommand::Connect => {
                self.connect().await;
                return;
            }
            SessionCommand::Disconnect => {
                self.disconnect().await;
                return;
            }
            SessionCommand::Execute(command) => (command.kind(), self.execute(&command).await),
            SessionCommand::SendUserMessage(text) => {
                ("user_message", self.send_user_message(&text).await)
            }
            SessionCommand::Rename { id, title } => {
                ("rename_conversation", self.rename(&id, &title).await)
            }
        };
        if let Err(e) = result {
            self.report_failure(kind, &e);
        }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        let shutdown = self.shutdown.clone();
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                event = self.link.poll() => self.handle_link_event(event).await,
            }
        }

        self.link.disconnect().await;
        self.sync_connection().await;
        tracing::debug!("session loop stopped");
    }
}

impl<T: Transport + 'static> Session<T> {
    /// Move the session onto its own task.
    pub fn spawn(self) -> SessionHandle {
        let (commands, receiver) = mpsc::channel(64);
        let updates = self.updates.clone();
        let shutdown = self.shutdown.clone();
        let task = tokio::spawn(self.run(receiver));
        SessionHandle { commands, updates, shutdown, task }
    }
}

/// Control handle for a spawned [`Session`].
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    updates: broadcast::Sender<SessionUpdate>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Queue a command for the session.
    pub async fn send(&self, command: SessionCommand) -> Result<()> {
        self.commands.send(command).await.map_err(|_| Error::SessionClosed)
    }

    /// Subscribe to session updates.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.updates.subscribe()
    }

    /// Stop the session and wait for its task to finish.
    pub async fn shutdown(self) -> Result<()> {
        self.shutdown.cancel();
        self.task.await.map_err(|e| Error::SessionTask(e.to_string()))
    }
}
