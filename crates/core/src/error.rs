// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for parley-core operations.

use thiserror::Error;

/// All possible errors that can occur in parley-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid status: '{0}'\n  hint: valid statuses are: queued, sent, delivered, read, failed")]
    InvalidStatus(String),

    #[error("invalid sender type: '{0}'\n  hint: valid sender types are: user, agent, system")]
    InvalidOrigin(String),

    #[error("invalid presence: '{0}'\n  hint: valid presence states are: online, offline, away, busy")]
    InvalidPresence(String),

    #[error("message has neither a body nor attachments")]
    EmptyMessage,

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for parley-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
