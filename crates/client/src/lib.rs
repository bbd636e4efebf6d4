// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! parley - real-time message sync for two-party chat.
//!
//! Keeps a client's view of a conversation consistent with the backend
//! across a push transport (WebSocket) that can fail silently and a pull
//! fallback (REST polling) that covers for it.
//!
//! # Main Components
//!
//! - [`sync::ChatEngine`] - owns the active [`sync::ChatSession`] and switches chats atomically
//! - [`sync::ChatSession`] - single writer over the message log for one chat
//! - [`sync::SendPipeline`] - optimistic sends with promotion or rollback
//! - [`Config`] - TOML configuration
//! - [`Error`] - Error types for the binary and library entry points
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use parley::sync::{ChatEngine, HttpBackend};
//! use parley::Config;
//!
//! let config = Config::resolve(None)?;
//! let backend = HttpBackend::new(&config.api_url, token.clone(), config.request_timeout())?;
//! let mut engine = ChatEngine::new(config.session_settings(), Arc::new(backend));
//!
//! let session = engine.switch_chat("c1", token).await?;
//! session.send("hi", vec![], None).await?;
//! ```

mod cli;
mod commands;

pub mod config;
pub mod error;
pub mod logging;
pub mod sync;

pub use cli::{Cli, Command};
pub use config::Config;
pub use error::{Error, Result};

/// Runs a CLI command to completion on a fresh tokio runtime.
pub fn run(cli: Cli) -> Result<()> {
    let config = Config::resolve(cli.config.as_deref())?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        match cli.command {
            Command::Watch { chat } => commands::watch::run(&config, cli.token, chat).await,
            Command::Send {
                chat,
                body,
                client_token,
            } => commands::send::run(&config, cli.token, chat, body, client_token).await,
        }
    })
}
