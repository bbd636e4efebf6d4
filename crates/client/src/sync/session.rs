// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! One chat's synchronization state, owned by a single writer task.
//!
//! The push transport, the pull fallback and the send pipeline are
//! concurrent in origin but serialized in effect: all of them submit to
//! the session task, which is the only code that touches the
//! [`MessageLog`]. Readers observe published snapshots through `watch`
//! channels.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parley_core::{
    Attachment, ClientToken, ConnectionState, Message, MessageId, MessageLog, MessageStatus,
    MergeOutcome, PresenceState, Reconcile,
};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::backend::Backend;
use super::connection::{ConnectionSettings, TransportConnection, TransportEvent};
use super::pipeline::{SendError, SendPipeline};
use super::polling::{FetchKind, FetchedBatch, PollSource, PollingFallback};
use super::transport::{ConnectTarget, Transport, TransportResult};

const EVENT_BUFFER: usize = 64;
const BATCH_BUFFER: usize = 8;
const COMMAND_BUFFER: usize = 64;
/// Queued changes after which a snapshot is published even under load.
const MAX_UNPUBLISHED: usize = 64;

/// Tunables for a chat session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Push endpoint; the chat id is added as a query parameter.
    pub push_url: String,
    pub poll_interval: Duration,
    pub poll_limit: u32,
    pub connection: ConnectionSettings,
    /// Fetch once from the cursor when the push transport recovers.
    pub catch_up_on_connect: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            push_url: "ws://localhost:8080/ws".to_string(),
            poll_interval: Duration::from_secs(4),
            poll_limit: 50,
            connection: ConnectionSettings::default(),
            catch_up_on_connect: true,
        }
    }
}

/// Published snapshot of the log.
///
/// Cloning a view is cheap; the entries are shared until the next publish.
#[derive(Debug, Clone, PartialEq)]
pub struct LogView {
    pub chat_id: String,
    pub messages: Arc<[Message]>,
    pub cursor: Option<DateTime<Utc>>,
    /// Bumped on every publish.
    pub revision: u64,
}

impl LogView {
    fn empty(chat_id: &str) -> Self {
        LogView {
            chat_id: chat_id.to_string(),
            messages: Arc::from(Vec::new()),
            cursor: None,
            revision: 0,
        }
    }
}

/// The session task has exited.
#[derive(Debug, Clone, thiserror::Error)]
#[error("chat session {0} is closed")]
pub struct SessionClosed(pub String);

pub(crate) enum Command {
    Merge {
        messages: Vec<Message>,
        reply: oneshot::Sender<Vec<MergeOutcome>>,
    },
    ApplyStatus {
        id: MessageId,
        status: MessageStatus,
        reply: oneshot::Sender<bool>,
    },
    Rollback {
        token: ClientToken,
        reply: oneshot::Sender<Option<Message>>,
    },
    Retry,
}

/// Cloneable handle for submitting mutations to a session.
#[derive(Clone)]
pub struct SessionHandle {
    chat_id: Arc<str>,
    commands: mpsc::Sender<Command>,
    cancel: CancellationToken,
}

impl SessionHandle {
    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    /// Merges messages into the log, one outcome per message.
    pub async fn merge(&self, messages: Vec<Message>) -> Result<Vec<MergeOutcome>, SessionClosed> {
        self.request(|reply| Command::Merge { messages, reply }).await
    }

    /// Advances the status of a known message.
    pub async fn apply_status(
        &self,
        id: MessageId,
        status: MessageStatus,
    ) -> Result<bool, SessionClosed> {
        self.request(|reply| Command::ApplyStatus { id, status, reply })
            .await
    }

    /// Removes the unresolved entry for `token`.
    pub async fn rollback(&self, token: ClientToken) -> Result<Option<Message>, SessionClosed> {
        self.request(|reply| Command::Rollback { token, reply }).await
    }

    /// Asks the push transport to reconnect.
    ///
    /// Ignored unless the transport is in `Error` or `Degraded`.
    pub async fn retry(&self) -> Result<(), SessionClosed> {
        self.commands
            .send(Command::Retry)
            .await
            .map_err(|_| self.closed())
    }

    /// Resolves once the session starts tearing down.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    async fn request<R>(
        &self,
        command: impl FnOnce(oneshot::Sender<R>) -> Command,
    ) -> Result<R, SessionClosed> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| self.closed())?;
        response.await.map_err(|_| self.closed())
    }

    fn closed(&self) -> SessionClosed {
        SessionClosed(self.chat_id.to_string())
    }
}

/// A live chat: push transport, pull fallback, send pipeline and log.
///
/// Dropping the session cancels it; [`close`](Self::close) also waits for
/// the transport to be released.
pub struct ChatSession {
    handle: SessionHandle,
    pipeline: SendPipeline,
    view: watch::Receiver<LogView>,
    state: watch::Receiver<ConnectionState>,
    presence: watch::Receiver<HashMap<String, PresenceState>>,
    polling: watch::Receiver<bool>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ChatSession {
    /// Opens a session for `chat_id` and starts connecting.
    pub fn open<T: Transport + 'static>(
        chat_id: impl Into<String>,
        auth_token: Option<String>,
        transport: T,
        backend: Arc<dyn Backend>,
        settings: &SessionSettings,
    ) -> TransportResult<Self> {
        let chat_id = chat_id.into();
        let target = ConnectTarget::for_chat(&settings.push_url, &chat_id, auth_token)?;
        let cancel = CancellationToken::new();

        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let (batch_tx, batch_rx) = mpsc::channel(BATCH_BUFFER);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (view_tx, view) = watch::channel(LogView::empty(&chat_id));
        let (cursor_tx, cursor) = watch::channel(None);
        let (state_tx, state) = watch::channel(ConnectionState::Connecting);
        let (presence_tx, presence) = watch::channel(HashMap::new());
        let (polling_tx, polling) = watch::channel(false);

        let fallback = PollingFallback::new(
            PollSource {
                chat_id: chat_id.clone(),
                backend: Arc::clone(&backend),
                cursor,
                batches: batch_tx,
                cancel: cancel.clone(),
            },
            settings.poll_interval,
            settings.poll_limit,
        );

        info!(chat_id = %chat_id, url = %target.url, "opening chat session");
        let connection = TransportConnection::spawn(
            transport,
            target,
            settings.connection.clone(),
            event_tx,
            cancel.child_token(),
        );

        let writer = SessionWriter {
            chat_id: chat_id.clone(),
            log: MessageLog::new(),
            state: ConnectionState::Connecting,
            recovering: false,
            catch_up_on_connect: settings.catch_up_on_connect,
            unpublished: 0,
            revision: 0,
            connection: Some(connection),
            fallback,
            view_tx,
            cursor_tx,
            state_tx,
            presence_tx,
            polling_tx,
        };
        let task = tokio::spawn(writer.run(event_rx, batch_rx, command_rx, cancel.clone()));

        let handle = SessionHandle {
            chat_id: Arc::from(chat_id.as_str()),
            commands: command_tx,
            cancel: cancel.clone(),
        };
        let pipeline = SendPipeline::new(handle.clone(), backend);

        Ok(ChatSession {
            handle,
            pipeline,
            view,
            state,
            presence,
            polling,
            cancel,
            task: Some(task),
        })
    }

    pub fn chat_id(&self) -> &str {
        self.handle.chat_id()
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn pipeline(&self) -> &SendPipeline {
        &self.pipeline
    }

    /// Sends a message through the pipeline.
    pub async fn send(
        &self,
        body: impl Into<String>,
        attachments: Vec<Attachment>,
        client_token: Option<ClientToken>,
    ) -> Result<Message, SendError> {
        self.pipeline.send(body, attachments, client_token).await
    }

    /// Re-attempts the push transport after a failure.
    pub async fn retry(&self) -> Result<(), SessionClosed> {
        self.handle.retry().await
    }

    pub async fn merge(&self, messages: Vec<Message>) -> Result<Vec<MergeOutcome>, SessionClosed> {
        self.handle.merge(messages).await
    }

    pub async fn apply_status(
        &self,
        id: MessageId,
        status: MessageStatus,
    ) -> Result<bool, SessionClosed> {
        self.handle.apply_status(id, status).await
    }

    pub async fn rollback(&self, token: ClientToken) -> Result<Option<Message>, SessionClosed> {
        self.handle.rollback(token).await
    }

    /// Snapshot of the log in display order.
    pub fn messages(&self) -> Arc<[Message]> {
        Arc::clone(&self.view.borrow().messages)
    }

    pub fn cursor(&self) -> Option<DateTime<Utc>> {
        self.view.borrow().cursor
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn presence(&self) -> HashMap<String, PresenceState> {
        self.presence.borrow().clone()
    }

    /// Returns true while the pull fallback is running.
    pub fn is_polling(&self) -> bool {
        *self.polling.borrow()
    }

    pub fn subscribe_log(&self) -> watch::Receiver<LogView> {
        self.view.clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    pub fn subscribe_presence(&self) -> watch::Receiver<HashMap<String, PresenceState>> {
        self.presence.clone()
    }

    pub fn subscribe_polling(&self) -> watch::Receiver<bool> {
        self.polling.clone()
    }

    /// Tears the session down and waits until the transport is released,
    /// the fallback is stopped and the log is cleared.
    pub async fn close(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// The single writer. Owns the log and every per-chat resource.
struct SessionWriter {
    chat_id: String,
    log: MessageLog,
    state: ConnectionState,
    /// Set after a push failure, cleared on the next `Connected`.
    recovering: bool,
    catch_up_on_connect: bool,
    /// Log changes not yet in the published view.
    unpublished: usize,
    revision: u64,
    connection: Option<TransportConnection>,
    fallback: PollingFallback,
    view_tx: watch::Sender<LogView>,
    cursor_tx: watch::Sender<Option<DateTime<Utc>>>,
    state_tx: watch::Sender<ConnectionState>,
    presence_tx: watch::Sender<HashMap<String, PresenceState>>,
    polling_tx: watch::Sender<bool>,
}

impl SessionWriter {
    async fn run(
        mut self,
        mut events: mpsc::Receiver<TransportEvent>,
        mut batches: mpsc::Receiver<FetchedBatch>,
        mut commands: mpsc::Receiver<Command>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some(event) = events.recv() => self.on_event(event),
                Some(batch) = batches.recv() => self.on_batch(batch),
                command = commands.recv() => match command {
                    Some(command) => self.on_command(command),
                    None => break,
                },
                // Input drained: publish what a burst of pushes changed
                _ = std::future::ready(()), if self.unpublished > 0 => self.publish(),
            }
        }

        // Nothing queued for this chat may be applied after this point
        cancel.cancel();
        drop(events);
        drop(batches);
        drop(commands);
        self.teardown().await;
    }

    async fn teardown(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close().await;
        }
        self.stop_fallback();
        self.log.clear();
        self.publish();
        info!(chat_id = %self.chat_id, "chat session closed");
    }

    fn on_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::StatusChanged(state) => self.on_status(state),
            TransportEvent::MessageReceived { chat_id, message } => {
                if chat_id != self.chat_id {
                    debug!(expected = %self.chat_id, got = %chat_id, "dropping message for another chat");
                    return;
                }
                if self.log.merge(message).changed() {
                    self.mark_changed();
                }
            }
            TransportEvent::MessageStatusChanged { id, status } => {
                if self.log.apply_status(&id, status) {
                    self.mark_changed();
                }
            }
            TransportEvent::PresenceChanged { peer_id, state } => {
                debug!(peer_id = %peer_id, %state, "presence changed");
                self.presence_tx.send_modify(|presence| {
                    presence.insert(peer_id, state);
                });
            }
        }
    }

    fn on_status(&mut self, next: ConnectionState) {
        match next {
            ConnectionState::Connecting => self.stop_fallback(),
            ConnectionState::Connected => {
                self.stop_fallback();
                if self.recovering && self.catch_up_on_connect {
                    self.fallback.catch_up();
                }
                self.recovering = false;
            }
            ConnectionState::Error => {
                self.recovering = true;
                if !self.state.needs_fallback() {
                    self.start_fallback();
                }
            }
            // Only the session itself decides when the fallback is covering
            ConnectionState::Degraded => return,
        }
        self.set_state(next);
    }

    fn on_batch(&mut self, batch: FetchedBatch) {
        if batch.chat_id != self.chat_id {
            debug!(expected = %self.chat_id, got = %batch.chat_id, "dropping stale batch");
            return;
        }
        if batch.kind == FetchKind::Fallback {
            if !self.fallback.is_current(batch.cycle) {
                debug!(cycle = batch.cycle, "dropping batch from a stopped fallback cycle");
                return;
            }
            if self.state == ConnectionState::Error {
                self.set_state(ConnectionState::Degraded);
            }
        }

        let fetched = batch.messages.len();
        let changed = self.log.merge_all(batch.messages);
        debug!(chat_id = %self.chat_id, kind = ?batch.kind, fetched, changed, "merged batch");
        if changed > 0 {
            self.mark_changed();
        }
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Merge { messages, reply } => {
                let outcomes: Vec<MergeOutcome> =
                    messages.into_iter().map(|m| self.log.merge(m)).collect();
                if outcomes.iter().any(MergeOutcome::changed) {
                    self.publish();
                }
                let _ = reply.send(outcomes);
            }
            Command::ApplyStatus { id, status, reply } => {
                let changed = self.log.apply_status(&id, status);
                if changed {
                    self.publish();
                }
                let _ = reply.send(changed);
            }
            Command::Rollback { token, reply } => {
                let removed = self.log.rollback(&token);
                if removed.is_some() {
                    self.publish();
                }
                let _ = reply.send(removed);
            }
            Command::Retry => self.retry(),
        }
    }

    fn retry(&mut self) {
        if !self.state.needs_fallback() {
            debug!(state = %self.state, "ignoring retry");
            return;
        }
        info!(chat_id = %self.chat_id, "retrying push transport");
        self.stop_fallback();
        self.set_state(ConnectionState::Connecting);
        if let Some(connection) = &self.connection {
            connection.retry();
        }
    }

    fn start_fallback(&mut self) {
        self.fallback.start();
        self.polling_tx.send_replace(true);
    }

    fn stop_fallback(&mut self) {
        self.fallback.stop();
        self.polling_tx.send_replace(false);
    }

    fn set_state(&mut self, next: ConnectionState) {
        if self.state != next {
            info!(chat_id = %self.chat_id, from = %self.state, to = %next, "connection state changed");
        }
        self.state = next;
        self.state_tx.send_if_modified(|state| {
            let changed = *state != next;
            *state = next;
            changed
        });
    }

    fn mark_changed(&mut self) {
        self.unpublished += 1;
        if self.unpublished >= MAX_UNPUBLISHED {
            self.publish();
        }
    }

    /// Rebuilds the view. Command replies publish first so callers read
    /// their own writes.
    fn publish(&mut self) {
        self.unpublished = 0;
        self.revision += 1;
        let cursor = self.log.cursor();
        self.cursor_tx.send_if_modified(|current| {
            let changed = *current != cursor;
            *current = cursor;
            changed
        });
        self.view_tx.send_replace(LogView {
            chat_id: self.chat_id.clone(),
            messages: self.log.iter().cloned().collect(),
            cursor,
            revision: self.revision,
        });
    }
}
