// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connection and presence signals published by a chat session.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Health of the push transport as seen by a chat session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// A push connection attempt is in progress.
    Connecting,
    /// The push transport is live.
    Connected,
    /// The push transport failed and the pull fallback is covering for it.
    Degraded,
    /// The push transport failed; the fallback has not yet delivered a batch.
    Error,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Degraded => "degraded",
            ConnectionState::Error => "error",
        }
    }

    /// Returns true while the pull fallback must be running.
    pub fn needs_fallback(&self) -> bool {
        matches!(self, ConnectionState::Error | ConnectionState::Degraded)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Availability of the remote peer. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceState {
    Online,
    Offline,
    Away,
    Busy,
}

impl PresenceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceState::Online => "online",
            PresenceState::Offline => "offline",
            PresenceState::Away => "away",
            PresenceState::Busy => "busy",
        }
    }
}

impl fmt::Display for PresenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PresenceState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "online" => Ok(PresenceState::Online),
            "offline" => Ok(PresenceState::Offline),
            "away" => Ok(PresenceState::Away),
            "busy" => Ok(PresenceState::Busy),
            _ => Err(Error::InvalidPresence(s.to_string())),
        }
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
