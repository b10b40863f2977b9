// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::Parser;
use pv_core::OutboundCommand;

use crate::error::{Error, Result};
use crate::sync::SessionCommand;

/// Parse a string that must not be empty or whitespace-only.
fn non_empty_string(s: &str) -> std::result::Result<String, String> {
    if s.trim().is_empty() {
        Err("cannot be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}

#[derive(Parser, Debug)]
#[command(name = "palaver")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Terminal client for a real-time conversation service")]
#[command(after_help = "\
Commands (one per line on stdin):
  /list                 Refresh the conversation list
  /open ID              Open a conversation
  /new TITLE            Create a conversation
  /rename ID TITLE      Rename a conversation
  /delete ID            Delete a conversation
  /clear                Delete every conversation
  /state                Print the current state
  /quit                 Disconnect and exit
  anything else         Send as a message to the open conversation")]
pub struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/palaver/config.toml)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Service url, overriding config and PALAVER_URL
    #[arg(long, value_parser = non_empty_string)]
    pub url: Option<String>,

    /// Credential sent as a bearer token, overriding config and PALAVER_TOKEN
    #[arg(long, value_parser = non_empty_string)]
    pub token: Option<String>,

    /// Log at debug level
    #[arg(long, short)]
    pub verbose: bool,
}

/// One parsed line of terminal input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// Forward to the session.
    Session(SessionCommand),
    /// Print the latest conversation state.
    ShowState,
    Quit,
    /// Blank input.
    Empty,
}

/// Parses one line of terminal input.
///
/// Lines starting with `/` are commands; anything else is a user message.
pub fn parse_line(line: &str) -> Result<Line> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Line::Empty);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Line::Session(SessionCommand::SendUserMessage(line.to_string())));
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    let command = match name {
        "list" => SessionCommand::Execute(OutboundCommand::ListConversations),
        "open" => SessionCommand::Execute(OutboundCommand::get(single_arg(args, "/open ID")?)),
        "new" => {
            if args.is_empty() {
                return Err(Error::Usage("/new TITLE"));
            }
            SessionCommand::Execute(OutboundCommand::create(args))
        }
        "rename" => {
            let usage = "/rename ID TITLE";
            let (id, title) = args.split_once(char::is_whitespace).ok_or(Error::Usage(usage))?;
            let title = title.trim();
            if title.is_empty() {
                return Err(Error::Usage(usage));
            }
            SessionCommand::Rename { id: id.to_string(), title: title.to_string() }
        }
        "delete" => {
            SessionCommand::Execute(OutboundCommand::delete(single_arg(args, "/delete ID")?))
        }
        "clear" => SessionCommand::Execute(OutboundCommand::ClearAll),
        "connect" => SessionCommand::Connect,
        "disconnect" => SessionCommand::Disconnect,
        "state" => return Ok(Line::ShowState),
        "quit" | "exit" => return Ok(Line::Quit),
        _ => return Err(Error::UnknownCommand(name.to_string())),
    };
    Ok(Line::Session(command))
}

fn single_arg<'a>(args: &'a str, usage: &'static str) -> Result<&'a str> {
    if args.is_empty() || args.contains(char::is_whitespace) {
        return Err(Error::Usage(usage));
    }
    Ok(args)
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
