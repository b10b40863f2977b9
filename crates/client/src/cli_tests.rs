// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use clap::CommandFactory;
use yare::parameterized;

#[test]
fn test_cli_is_well_formed() {
    Cli::command().debug_assert();
}

#[test]
fn test_cli_flags() {
    let cli = Cli::try_parse_from([
        "palaver",
        "--config",
        "/tmp/palaver.toml",
        "--url",
        "wss://chat.example.com",
        "--token",
        "t0k",
        "-v",
    ])
    .unwrap();
    assert_eq!(cli.config, Some(PathBuf::from("/tmp/palaver.toml")));
    assert_eq!(cli.url.as_deref(), Some("wss://chat.example.com"));
    assert_eq!(cli.token.as_deref(), Some("t0k"));
    assert!(cli.verbose);
}

#[test]
fn test_cli_defaults() {
    let cli = Cli::try_parse_from(["palaver"]).unwrap();
    assert!(cli.config.is_none());
    assert!(cli.url.is_none());
    assert!(!cli.verbose);
}

#[test]
fn test_cli_rejects_blank_url() {
    assert!(Cli::try_parse_from(["palaver", "--url", "  "]).is_err());
}

#[parameterized(
    list = { "/list", SessionCommand::Execute(OutboundCommand::ListConversations) },
    open = { "/open conv-1", SessionCommand::Execute(OutboundCommand::get("conv-1")) },
    new = { "/new Trip plans", SessionCommand::Execute(OutboundCommand::create("Trip plans")) },
    rename = {
        "/rename conv-1  Road trip ",
        SessionCommand::Rename { id: "conv-1".into(), title: "Road trip".into() }
    },
    delete = { "/delete conv-2", SessionCommand::Execute(OutboundCommand::delete("conv-2")) },
    clear = { "/clear", SessionCommand::Execute(OutboundCommand::ClearAll) },
    connect = { "/connect", SessionCommand::Connect },
    disconnect = { "/disconnect", SessionCommand::Disconnect },
    message = { "  hello there ", SessionCommand::SendUserMessage("hello there".into()) },
)]
fn test_parse_session_commands(input: &str, expected: SessionCommand) {
    assert_eq!(parse_line(input).unwrap(), Line::Session(expected));
}

#[parameterized(
    state = { "/state", Line::ShowState },
    quit = { "/quit", Line::Quit },
    exit = { "/exit", Line::Quit },
    blank = { "   ", Line::Empty },
)]
fn test_parse_local_lines(input: &str, expected: Line) {
    assert_eq!(parse_line(input).unwrap(), expected);
}

#[parameterized(
    open_missing = { "/open" },
    open_extra = { "/open a b" },
    new_missing = { "/new" },
    rename_missing_title = { "/rename conv-1" },
    rename_missing_both = { "/rename" },
    delete_missing = { "/delete" },
)]
fn test_parse_usage_errors(input: &str) {
    assert!(matches!(parse_line(input), Err(Error::Usage(_))));
}

#[test]
fn test_parse_unknown_command() {
    match parse_line("/frobnicate now") {
        Err(Error::UnknownCommand(name)) => assert_eq!(name, "frobnicate"),
        other => unreachable!("unexpected {other:?}"),
    }
}
