// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod output;
pub mod send;
pub mod watch;

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::sync::{ChatEngine, HttpBackend};

/// Builds an engine wired to the configured backend.
fn engine(config: &Config, token: Option<String>) -> Result<ChatEngine> {
    let backend = HttpBackend::new(&config.api_url, token, config.request_timeout())?;
    Ok(ChatEngine::new(config.session_settings(), Arc::new(backend)))
}
