// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::sync::{BackendError, SendError, SessionClosed, TransportError};

/// Errors surfaced by the `parley` binary and its library entry points.
///
/// Errors provide user-friendly messages with hints for common issues.
#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid config: {field}: {reason}\n  hint: check {field} in your config file")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("push transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("{0}")]
    Send(#[from] SendError),

    #[error(transparent)]
    Session(#[from] SessionClosed),

    #[error(transparent)]
    Core(#[from] parley_core::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
