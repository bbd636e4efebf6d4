// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::CONFIG_ENV;

const QUICKSTART_HELP: &str = "\
Get started:
  parley watch --chat c1          Follow a chat (type to send, /retry to reconnect)
  parley send --chat c1 \"hi\"      Send one message";

#[derive(Parser)]
#[command(name = "parley", version)]
#[command(about = "Real-time chat client with push transport and pull fallback")]
#[command(after_help = QUICKSTART_HELP)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true, env = CONFIG_ENV)]
    pub config: Option<PathBuf>,

    /// Bearer token for the chat backend
    #[arg(long, global = true, env = "PARLEY_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Follow a chat, printing messages and connection changes until Ctrl-C
    #[command(after_help = "Input:\n  \
        <text>    Send a message\n  \
        /retry    Reconnect the push transport after a failure")]
    Watch {
        /// Chat to follow
        #[arg(long)]
        chat: String,
    },

    /// Send one message and print the confirmed record
    Send {
        /// Chat to post to
        #[arg(long)]
        chat: String,

        /// Message text
        body: String,

        /// Correlation token (generated if omitted)
        #[arg(long)]
        client_token: Option<String>,
    },
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
