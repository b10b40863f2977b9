// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket server implementation.
//!
//! Handles client connections, command dispatch, and broadcast fanout.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

use pv_core::{Message, OutboundCommand, ServerMessage};

use crate::state::{RelayError, RelayState};

/// Replies for one client frame.
#[derive(Debug, Default)]
pub(crate) struct Dispatch {
    /// Sent only to the requesting connection.
    pub direct: Vec<ServerMessage>,
    /// Sent to every connection, the requester included.
    pub broadcast: Vec<ServerMessage>,
}

impl Dispatch {
    fn direct(message: ServerMessage) -> Self {
        Dispatch { direct: vec![message], broadcast: Vec::new() }
    }

    /// A mutation event: answered directly and broadcast.
    fn mutation(event: ServerMessage) -> Self {
        Dispatch { direct: vec![event.clone()], broadcast: vec![event] }
    }
}

/// Run the WebSocket server on the given address.
pub async fn run(addr: SocketAddr, state: RelayState) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on: {}", addr);

    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let state = state.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }
}

/// Handle a single WebSocket connection.
pub(crate) async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: RelayState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    info!("New WebSocket connection from: {}", peer_addr);

    let (mut ws_sink, mut ws_stream) = ws_stream.split();
    let mut broadcast_rx = state.subscribe();

    loop {
        tokio::select! {
            msg = ws_stream.next() => {
                match msg {
                    Some(Ok(WsMessage::Text(text))) => {
                        let dispatch = handle_client_message(text.as_str(), &state).await;
                        for reply in dispatch.direct {
                            ws_sink.send(WsMessage::Text(reply.to_json()?.into())).await?;
                        }
                        for event in dispatch.broadcast {
                            state.broadcast(event);
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) => {
                        info!("Client {} disconnected", peer_addr);
                        break;
                    }
                    Some(Ok(WsMessage::Ping(data))) => {
                        ws_sink.send(WsMessage::Pong(data)).await?;
                    }
                    Some(Ok(WsMessage::Binary(data))) => {
                        debug!("Ignoring {} binary bytes from {}", data.len(), peer_addr);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("WebSocket error from {}: {}", peer_addr, e);
                        break;
                    }
                    None => {
                        info!("Client {} stream ended", peer_addr);
                        break;
                    }
                }
            }

            broadcast = broadcast_rx.recv() => {
                match broadcast {
                    Ok(msg) => {
                        let json = msg.to_json()?;
                        if let Err(e) = ws_sink.send(WsMessage::Text(json.into())).await {
                            warn!("Failed to send broadcast to {}: {}", peer_addr, e);
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Client {} lagged by {} messages", peer_addr, n);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        }
    }

    info!("Connection closed: {}", peer_addr);
    Ok(())
}

/// Process one client frame.
///
/// Failures never close the connection; they come back as `error` frames.
pub(crate) async fn handle_client_message(text: &str, state: &RelayState) -> Dispatch {
    let command = match OutboundCommand::from_json(text) {
        Ok(command) => command,
        Err(e) => {
            warn!("Malformed client frame: {}", e);
            return Dispatch::direct(ServerMessage::error(format!("malformed command: {}", e)));
        }
    };
    debug!("Received command: {}", command.kind());

    match dispatch(command, state).await {
        Ok(dispatch) => dispatch,
        Err(e) => Dispatch::direct(ServerMessage::error(e.to_string())),
    }
}

async fn dispatch(command: OutboundCommand, state: &RelayState) -> Result<Dispatch, RelayError> {
    let dispatch = match command {
        OutboundCommand::ListConversations => {
            Dispatch::direct(ServerMessage::conversations_list(state.list().await))
        }
        OutboundCommand::GetConversation { conversation_id } => {
            Dispatch::direct(ServerMessage::conversation_data(state.get(&conversation_id).await?))
        }
        OutboundCommand::CreateConversation { title } => {
            let id = state.create(&title).await?;
            info!("Created {}", id);
            Dispatch::mutation(ServerMessage::created(id))
        }
        OutboundCommand::RenameConversation { conversation_id, title } => {
            state.rename(&conversation_id, &title).await?;
            Dispatch::mutation(ServerMessage::renamed(conversation_id, title.trim()))
        }
        OutboundCommand::DeleteConversation { conversation_id } => {
            let replacement = state.delete(&conversation_id).await?;
            info!("Deleted {}", conversation_id);
            Dispatch::mutation(ServerMessage::deleted(conversation_id, replacement))
        }
        OutboundCommand::ClearAll => {
            let replacement = state.clear().await?;
            info!("Cleared all conversations");
            Dispatch::mutation(ServerMessage::cleared(Some(replacement)))
        }
        OutboundCommand::SendUserMessage { text, conversation_id } => {
            let exchange = state.add_user_message(&text, conversation_id.as_deref()).await?;
            let mut broadcast = vec![ServerMessage::message(exchange.user)];
            broadcast.extend(stream_chunks(&exchange.reply));
            Dispatch { direct: Vec::new(), broadcast }
        }
    };
    Ok(dispatch)
}

/// Split a reply into `assistant_text` chunks, one word each.
pub(crate) fn stream_chunks(reply: &Message) -> Vec<ServerMessage> {
    let words: Vec<&str> = reply.content.split_inclusive(' ').collect();
    let last = words.len().saturating_sub(1);
    words
        .iter()
        .enumerate()
        .map(|(i, word)| ServerMessage::AssistantText {
            conversation_id: Some(reply.conversation_id.clone()),
            message_id: Some(reply.id.clone()),
            text: (*word).to_string(),
            done: i == last,
            timestamp: Some(reply.timestamp),
        })
        .collect()
}
