// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Optimistic sends.
//!
//! A send shows up in the log as a `queued` entry before the network call
//! and is then either promoted in place to the server's record or rolled
//! back. A failed send never leaves its optimistic entry behind.

use std::sync::Arc;

use chrono::Utc;
use parley_core::protocol::SendRequest;
use parley_core::{Attachment, ClientToken, MergeOutcome, Message};
use reqwest::StatusCode;
use tracing::{debug, warn};

use super::backend::{Backend, BackendError};
use super::session::{SessionClosed, SessionHandle};

/// Failure of a single send. Only that message is affected.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("message has neither a body nor attachments")]
    EmptyMessage,

    /// A message with this token is pending or already confirmed.
    #[error("client token {0} is already in use")]
    DuplicateToken(ClientToken),

    /// The server refused the message.
    #[error("send rejected: {status} body={body}")]
    Rejected { status: StatusCode, body: String },

    #[error("send failed: {0}")]
    Network(BackendError),

    /// The session was torn down while the send was in flight.
    #[error("send cancelled by chat switch")]
    Cancelled,

    #[error(transparent)]
    Closed(#[from] SessionClosed),
}

impl From<BackendError> for SendError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Rejected { status, body } => SendError::Rejected { status, body },
            other => SendError::Network(other),
        }
    }
}

/// Turns compose actions into log entries for one session.
#[derive(Clone)]
pub struct SendPipeline {
    session: SessionHandle,
    backend: Arc<dyn Backend>,
}

impl SendPipeline {
    pub fn new(session: SessionHandle, backend: Arc<dyn Backend>) -> Self {
        SendPipeline { session, backend }
    }

    /// Sends a message and returns the server's record.
    ///
    /// Generates a client token when none is given. On any failure after
    /// the optimistic entry was added, the entry is rolled back before the
    /// error is returned.
    pub async fn send(
        &self,
        body: impl Into<String>,
        attachments: Vec<Attachment>,
        client_token: Option<ClientToken>,
    ) -> Result<Message, SendError> {
        let token = client_token.unwrap_or_else(ClientToken::generate);
        let optimistic = Message::optimistic(token.clone(), body, attachments, Utc::now());
        optimistic.validate().map_err(|_| SendError::EmptyMessage)?;
        let request = SendRequest {
            chat_id: self.session.chat_id().to_string(),
            body: optimistic.body.clone(),
            client_token: token.clone(),
            attachments: optimistic.attachments.clone(),
        };

        let outcomes = self.session.merge(vec![optimistic]).await?;
        if outcomes.first() != Some(&MergeOutcome::Inserted) {
            return Err(SendError::DuplicateToken(token));
        }
        debug!(chat_id = %self.session.chat_id(), token = %token, "optimistic entry queued");

        let posted = tokio::select! {
            _ = self.session.cancelled() => return Err(SendError::Cancelled),
            posted = self.backend.post_message(request) => posted,
        };

        match posted {
            Ok(mut confirmed) => {
                confirmed.client_token = Some(token.clone());
                self.session.merge(vec![confirmed.clone()]).await?;
                debug!(token = %token, id = ?confirmed.id, "send confirmed");
                Ok(confirmed)
            }
            Err(e) => {
                warn!(chat_id = %self.session.chat_id(), token = %token, error = %e, "send failed");
                // A closed session has already cleared its log
                let _ = self.session.rollback(token).await;
                Err(e.into())
            }
        }
    }
}
