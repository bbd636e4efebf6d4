// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Active-chat management.

use std::sync::Arc;

use tracing::info;

use super::backend::Backend;
use super::session::{ChatSession, SessionSettings};
use super::transport::{Transport, TransportResult, WebSocketTransport};

type TransportFactory<T> = Box<dyn Fn() -> T + Send + Sync>;

/// Holds at most one [`ChatSession`] and swaps it atomically.
///
/// Generic over the transport so tests can inject a mock.
pub struct ChatEngine<T: Transport = WebSocketTransport> {
    settings: SessionSettings,
    backend: Arc<dyn Backend>,
    make_transport: TransportFactory<T>,
    active: Option<ChatSession>,
}

impl ChatEngine<WebSocketTransport> {
    /// Creates an engine that connects over WebSocket.
    pub fn new(settings: SessionSettings, backend: Arc<dyn Backend>) -> Self {
        Self::with_transport(settings, backend, WebSocketTransport::new)
    }
}

impl<T: Transport + 'static> ChatEngine<T> {
    /// Creates an engine with a custom transport factory.
    pub fn with_transport(
        settings: SessionSettings,
        backend: Arc<dyn Backend>,
        make_transport: impl Fn() -> T + Send + Sync + 'static,
    ) -> Self {
        ChatEngine {
            settings,
            backend,
            make_transport: Box::new(make_transport),
            active: None,
        }
    }

    /// Makes `chat_id` the active chat.
    ///
    /// The previous session is fully torn down before the new one opens:
    /// its transport is released, its fallback stopped, its log cleared, and
    /// anything still in flight for it is discarded.
    pub async fn switch_chat(
        &mut self,
        chat_id: impl Into<String>,
        auth_token: Option<String>,
    ) -> TransportResult<&ChatSession> {
        let chat_id = chat_id.into();
        if let Some(previous) = self.active.take() {
            info!(from = %previous.chat_id(), to = %chat_id, "switching chat");
            previous.close().await;
        }
        let session = ChatSession::open(
            chat_id,
            auth_token,
            (self.make_transport)(),
            Arc::clone(&self.backend),
            &self.settings,
        )?;
        Ok(self.active.insert(session))
    }

    pub fn active(&self) -> Option<&ChatSession> {
        self.active.as_ref()
    }

    /// Closes the active session, if any.
    pub async fn close(&mut self) {
        if let Some(session) = self.active.take() {
            session.close().await;
        }
    }
}
