// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Wire formats for the push transport and the REST fallback.
//!
//! The push transport delivers JSON envelopes discriminated by `type`:
//! - `chat_status`: informational, no log effect
//! - `chat_message`: a message for a chat, merged when the chat is active
//! - `message_status`: a status update routed to `apply_status`
//! - `presence_update`: peer presence, informational
//!
//! Any other `type` decodes to [`Frame::Unrecognized`] so callers can log and
//! drop it without treating it as an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::connection::PresenceState;
use crate::message::{Attachment, ClientToken, Message, MessageId, MessageStatus, Origin};

/// Envelope `type` values this client understands.
const KNOWN_TYPES: [&str; 4] = [
    "chat_status",
    "chat_message",
    "message_status",
    "presence_update",
];

/// Envelopes sent from the server over the push transport.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    /// Chat-level status notice.
    ChatStatus {
        /// Free-form status, not interpreted.
        status: serde_json::Value,
    },

    /// A message belonging to a chat.
    ChatMessage { payload: ChatMessagePayload },

    /// A delivery status change for a known message.
    MessageStatus { data: StatusUpdate },

    /// The peer's availability changed.
    PresenceUpdate { payload: PresencePayload },
}

/// Payload of a `chat_message` envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessagePayload {
    pub chat_id: String,
    pub message: MessageRecord,
}

/// Payload of a `message_status` envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub message_id: MessageId,
    pub status: MessageStatus,
}

/// Payload of a `presence_update` envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PresencePayload {
    pub agent_id: String,
    pub status: PresenceState,
}

/// A message as the backend serializes it, on both push and REST paths.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: MessageId,
    pub sender_type: Origin,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
    /// Echoed back for messages this client created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_token: Option<ClientToken>,
}

impl From<MessageRecord> for Message {
    fn from(record: MessageRecord) -> Self {
        Message {
            id: Some(record.id),
            client_token: record.client_token,
            origin: record.sender_type,
            body: record.body,
            attachments: record.attachments,
            status: record.status,
            created_at: record.created_at,
        }
    }
}

/// Body of `POST /messages`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub chat_id: String,
    pub body: String,
    pub client_token: ClientToken,
    pub attachments: Vec<Attachment>,
}

/// Response of `GET /messages`.
///
/// Accepts a bare array or an object wrapping it in `messages`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FetchResponse {
    List(Vec<MessageRecord>),
    Wrapped { messages: Vec<MessageRecord> },
}

impl FetchResponse {
    pub fn into_messages(self) -> Vec<Message> {
        let records = match self {
            FetchResponse::List(records) => records,
            FetchResponse::Wrapped { messages } => messages,
        };
        records.into_iter().map(Message::from).collect()
    }
}

/// Error decoding a push frame. Never fatal; frames that fail are dropped.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame is not valid JSON: {0}")]
    NotJson(#[source] serde_json::Error),

    #[error("frame has no string `type` field")]
    MissingType,

    #[error("malformed `{kind}` frame: {source}")]
    Malformed {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A decoded push frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Envelope(Envelope),
    /// A well-formed frame with a `type` this client does not handle.
    Unrecognized(String),
}

impl Frame {
    /// Decodes a text frame.
    pub fn decode(text: &str) -> Result<Frame, FrameError> {
        let value: serde_json::Value = serde_json::from_str(text).map_err(FrameError::NotJson)?;
        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or(FrameError::MissingType)?
            .to_string();

        if !KNOWN_TYPES.contains(&kind.as_str()) {
            return Ok(Frame::Unrecognized(kind));
        }

        serde_json::from_value(value)
            .map(Frame::Envelope)
            .map_err(|source| FrameError::Malformed { kind, source })
    }
}

impl Envelope {
    /// Serializes the envelope to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Creates a `chat_message` envelope.
    pub fn chat_message(chat_id: impl Into<String>, message: MessageRecord) -> Self {
        Envelope::ChatMessage {
            payload: ChatMessagePayload {
                chat_id: chat_id.into(),
                message,
            },
        }
    }

    /// Creates a `message_status` envelope.
    pub fn message_status(message_id: MessageId, status: MessageStatus) -> Self {
        Envelope::MessageStatus {
            data: StatusUpdate { message_id, status },
        }
    }

    /// Creates a `presence_update` envelope.
    pub fn presence(agent_id: impl Into<String>, status: PresenceState) -> Self {
        Envelope::PresenceUpdate {
            payload: PresencePayload {
                agent_id: agent_id.into(),
                status,
            },
        }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
