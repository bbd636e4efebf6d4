// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Core message types for the parley chat log.
//!
//! This module contains the atomic unit of the log, [`Message`], along with
//! its identifiers, sender origin, delivery status, and attachment
//! references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Server-assigned message identifier. Authoritative once present.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        MessageId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        MessageId::new(s)
    }
}

/// Client-generated correlation token for a locally-originated message.
///
/// Matches the server's authoritative id back to the optimistic entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientToken(String);

impl ClientToken {
    pub fn new(token: impl Into<String>) -> Self {
        ClientToken(token.into())
    }

    /// Generates a fresh random token.
    pub fn generate() -> Self {
        ClientToken(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientToken {
    fn from(s: &str) -> Self {
        ClientToken::new(s)
    }
}

/// Who authored a message.
///
/// The wire names follow the backend's `senderType` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Origin {
    /// The user of this client.
    #[serde(rename = "user")]
    LocalUser,
    /// The other party of the conversation.
    #[serde(rename = "agent")]
    RemotePeer,
    /// Messages generated by the backend itself.
    #[serde(rename = "system")]
    System,
}

impl Origin {
    /// Returns the wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::LocalUser => "user",
            Origin::RemotePeer => "agent",
            Origin::System => "system",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Origin {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Origin::LocalUser),
            "agent" => Ok(Origin::RemotePeer),
            "system" => Ok(Origin::System),
            _ => Err(Error::InvalidOrigin(s.to_string())),
        }
    }
}

/// Delivery status of a message.
///
/// Progression is `queued → sent → delivered → read`. `failed` is terminal
/// and only reachable from `queued`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Created locally, not yet accepted by the server.
    Queued,
    /// Accepted by the server.
    Sent,
    /// Delivered to the peer.
    Delivered,
    /// Read by the peer.
    Read,
    /// Never reached the network.
    Failed,
}

impl MessageStatus {
    /// Returns the string representation used on the wire and in display.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Queued => "queued",
            MessageStatus::Sent => "sent",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Read => "read",
            MessageStatus::Failed => "failed",
        }
    }

    /// Position in the delivery progression. `None` for `Failed`.
    pub fn rank(&self) -> Option<u8> {
        match self {
            MessageStatus::Queued => Some(0),
            MessageStatus::Sent => Some(1),
            MessageStatus::Delivered => Some(2),
            MessageStatus::Read => Some(3),
            MessageStatus::Failed => None,
        }
    }

    /// Check if moving from this status to `next` is a forward transition.
    ///
    /// Self-transitions and regressions are not.
    pub fn can_advance_to(&self, next: MessageStatus) -> bool {
        match (self, next) {
            (MessageStatus::Queued, MessageStatus::Failed) => true,
            (MessageStatus::Failed, _) | (_, MessageStatus::Failed) => false,
            (current, next) => next.rank() > current.rank(),
        }
    }

    /// Returns whichever of the two statuses is further along.
    ///
    /// When neither can advance to the other, `self` is kept.
    pub fn furthest(self, other: MessageStatus) -> MessageStatus {
        if self.can_advance_to(other) {
            other
        } else {
            self
        }
    }

    /// Returns true if no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MessageStatus::Read | MessageStatus::Failed)
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MessageStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "queued" => Ok(MessageStatus::Queued),
            "sent" => Ok(MessageStatus::Sent),
            "delivered" => Ok(MessageStatus::Delivered),
            "read" => Ok(MessageStatus::Read),
            "failed" => Ok(MessageStatus::Failed),
            _ => Err(Error::InvalidStatus(s.to_string())),
        }
    }
}

/// A pre-uploaded file referenced by a message. Opaque to the sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub file_name: String,
    /// MIME type as reported by the uploader.
    pub file_type: String,
    /// Size in bytes.
    pub file_size: u64,
    pub storage_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
}

/// A single entry of the chat log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Authoritative id, absent while the message is an unresolved optimistic entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,
    /// Correlation token, present on every locally-originated message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_token: Option<ClientToken>,
    pub origin: Origin,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub status: MessageStatus,
    /// Used for log ordering and as the fallback poll cursor.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Creates an optimistic local entry: queued, token only, no id.
    pub fn optimistic(
        client_token: ClientToken,
        body: impl Into<String>,
        attachments: Vec<Attachment>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Message {
            id: None,
            client_token: Some(client_token),
            origin: Origin::LocalUser,
            body: body.into(),
            attachments,
            status: MessageStatus::Queued,
            created_at,
        }
    }

    /// Creates a server-confirmed message.
    pub fn confirmed(
        id: MessageId,
        origin: Origin,
        body: impl Into<String>,
        status: MessageStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Message {
            id: Some(id),
            client_token: None,
            origin,
            body: body.into(),
            attachments: Vec::new(),
            status,
            created_at,
        }
    }

    /// Sets the correlation token.
    pub fn with_client_token(mut self, token: ClientToken) -> Self {
        self.client_token = Some(token);
        self
    }

    /// Sets the attachment list.
    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    /// Returns true once the server has assigned an id.
    pub fn is_resolved(&self) -> bool {
        self.id.is_some()
    }

    /// Returns true if there is nothing to deliver.
    pub fn is_empty(&self) -> bool {
        self.body.is_empty() && self.attachments.is_empty()
    }

    /// Rejects messages with neither a body nor attachments.
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::EmptyMessage);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
