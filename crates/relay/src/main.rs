// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! palaver-relay: development WebSocket service for the palaver client.
//!
//! Keeps conversations in memory and speaks the client's JSON protocol.
//! Every mutation is answered directly and also broadcast to all
//! connections, so a client sees each mutation event twice.

mod server;
#[cfg(test)]
mod server_tests;
mod state;

use clap::Parser;
use std::net::SocketAddr;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// palaver-relay: in-memory conversation service
#[derive(Parser, Debug)]
#[command(name = "palaver-relay")]
#[command(about = "Development WebSocket service for the palaver client")]
struct Args {
    /// Address to bind the server to
    #[arg(short, long, default_value = "0.0.0.0:7890")]
    bind: SocketAddr,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting palaver-relay");
    info!("  Bind address: {}", args.bind);

    let state = state::RelayState::new();
    server::run(args.bind, state).await?;

    Ok(())
}
