// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! palaver - session synchronization for a real-time conversation client.
//!
//! This crate keeps a client's view of its conversations consistent over a
//! WebSocket link that may drop, duplicate, or reorder messages, and ships
//! the `palaver` terminal client built on it.
//!
//! # Main Components
//!
//! - [`sync`] - Connection supervision, reliable publishing, inbound routing,
//!   deduplication, and the [`Session`](sync::Session) loop that wires them
//! - [`state`] - The pure conversation state reducer
//! - [`Config`] - TOML configuration with environment overrides
//! - [`Error`] - Error types for configuration and session control
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use palaver::sync::{Session, SessionCommand, TokioSleeper, WebSocketTransport};
//! use palaver::Config;
//! use pv_core::MonotonicClock;
//!
//! let config = Config::resolve(None)?;
//! config.validate()?;
//! let handle = Session::new(
//!     WebSocketTransport::new(),
//!     config.session_config(),
//!     Arc::new(MonotonicClock::new()),
//!     Arc::new(TokioSleeper),
//! )
//! .spawn();
//! let mut updates = handle.subscribe();
//! handle.send(SessionCommand::Connect).await?;
//! ```

mod cli;
mod display;

pub mod config;
pub mod env;
pub mod error;
pub mod logging;
pub mod state;
pub mod sync;

pub use cli::{parse_line, Cli, Line};
pub use config::Config;
pub use error::{Error, Result};

use std::sync::Arc;

use pv_core::MonotonicClock;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

use crate::state::ConversationState;
use crate::sync::{Session, SessionCommand, SessionUpdate, TokioSleeper, WebSocketTransport};

/// Run the terminal client until stdin closes or `/quit`.
pub async fn run(cli: Cli) -> Result<()> {
    logging::init(cli.verbose);

    let mut config = Config::resolve(cli.config.as_deref())?;
    config.apply_overrides(cli.url, cli.token);
    config.validate()?;
    info!(url = %config.url, "starting session");

    let handle = Session::new(
        WebSocketTransport::new(),
        config.session_config(),
        Arc::new(MonotonicClock::new()),
        Arc::new(TokioSleeper),
    )
    .spawn();

    let (latest_tx, latest) = watch::channel(ConversationState::default());
    let printer = tokio::spawn(print_updates(handle.subscribe(), latest_tx));
    handle.send(SessionCommand::Connect).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_line(&line) {
            Ok(Line::Empty) => {}
            Ok(Line::Quit) => break,
            Ok(Line::ShowState) => print!("{}", display::format_state(&latest.borrow())),
            Ok(Line::Session(command)) => handle.send(command).await?,
            Err(e) => eprintln!("error: {}", e),
        }
    }

    handle.shutdown().await?;
    printer.abort();
    Ok(())
}

/// Print each session update and publish the latest conversation snapshot.
async fn print_updates(
    mut updates: broadcast::Receiver<SessionUpdate>,
    latest: watch::Sender<ConversationState>,
) {
    loop {
        let update = match updates.recv().await {
            Ok(update) => update,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "display fell behind session updates");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        for line in display::render_update(&latest.borrow(), &update) {
            println!("{}", line);
        }
        if let SessionUpdate::Conversation(state) = update {
            latest.send_replace(state);
        }
    }
}
