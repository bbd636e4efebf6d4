// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::*;
use clap::CommandFactory;

#[test]
fn test_cli_definition_is_valid() {
    Cli::command().debug_assert();
}

#[test]
fn test_parse_watch() {
    let cli = Cli::try_parse_from(["parley", "watch", "--chat", "c1"]).unwrap();
    assert_eq!(
        cli.command,
        Command::Watch {
            chat: "c1".to_string()
        }
    );
}

#[test]
fn test_parse_send_with_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "parley",
        "send",
        "--chat",
        "c1",
        "hello there",
        "--token",
        "tok",
        "--config",
        "/tmp/parley.toml",
    ])
    .unwrap();
    assert_eq!(
        cli.command,
        Command::Send {
            chat: "c1".to_string(),
            body: "hello there".to_string(),
            client_token: None,
        }
    );
    assert_eq!(cli.token.as_deref(), Some("tok"));
    assert_eq!(cli.config, Some(PathBuf::from("/tmp/parley.toml")));
}

#[test]
fn test_send_requires_chat() {
    assert!(Cli::try_parse_from(["parley", "send", "hello"]).is_err());
}
