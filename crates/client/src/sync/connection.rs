// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Push-transport lifecycle for one chat session.
//!
//! A background task owns the [`Transport`], turns raw frames into typed
//! [`TransportEvent`]s, and reports connection state changes. After a
//! failure it emits `Error` once and then waits: reconnection only happens
//! when [`TransportConnection::retry`] is called.

use std::sync::Arc;
use std::time::Duration;

use parley_core::protocol::{Envelope, Frame};
use parley_core::{ConnectionState, Message, MessageId, MessageStatus, PresenceState};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::transport::{ConnectTarget, Inbound, Transport};

/// Events sent from the connection task to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The push transport changed state.
    StatusChanged(ConnectionState),
    /// A message arrived for `chat_id`.
    MessageReceived { chat_id: String, message: Message },
    /// A known message changed status.
    MessageStatusChanged { id: MessageId, status: MessageStatus },
    /// The peer's presence changed.
    PresenceChanged { peer_id: String, state: PresenceState },
}

/// Timing knobs for the push transport.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Upper bound on a single connect attempt.
    pub connect_timeout: Duration,
    /// Ping period. `None` disables pings.
    pub heartbeat_interval: Option<Duration>,
    /// Silence after which the session counts as dead. `None` disables.
    pub idle_timeout: Option<Duration>,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        ConnectionSettings {
            connect_timeout: Duration::from_secs(10),
            heartbeat_interval: Some(Duration::from_secs(30)),
            idle_timeout: None,
        }
    }
}

/// Handle to a running push-transport task.
///
/// Dropping the handle cancels the task, which releases the transport.
pub struct TransportConnection {
    retry: Arc<Notify>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl TransportConnection {
    /// Spawns the connection task and starts the first connect attempt.
    ///
    /// `cancel` should be a child of the owning session's token.
    pub fn spawn<T: Transport + 'static>(
        transport: T,
        target: ConnectTarget,
        settings: ConnectionSettings,
        events: mpsc::Sender<TransportEvent>,
        cancel: CancellationToken,
    ) -> Self {
        let retry = Arc::new(Notify::new());
        let task = tokio::spawn(run(
            transport,
            target,
            settings,
            events,
            Arc::clone(&retry),
            cancel.clone(),
        ));
        TransportConnection {
            retry,
            cancel,
            task: Some(task),
        }
    }

    /// Re-attempts the push transport after a failure.
    ///
    /// Only meaningful once `Error` has been reported.
    pub fn retry(&self) {
        self.retry.notify_one();
    }

    /// Tears the session down and waits for the transport to be released.
    pub async fn close(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TransportConnection {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Why a receive loop stopped.
enum ReceiveEnd {
    Cancelled,
    Failed(String),
}

async fn run<T: Transport>(
    mut transport: T,
    target: ConnectTarget,
    settings: ConnectionSettings,
    events: mpsc::Sender<TransportEvent>,
    retry: Arc<Notify>,
    cancel: CancellationToken,
) {
    loop {
        if !emit(&events, TransportEvent::StatusChanged(ConnectionState::Connecting)).await {
            break;
        }

        let attempt = tokio::select! {
            _ = cancel.cancelled() => break,
            result = tokio::time::timeout(settings.connect_timeout, transport.connect(&target)) => result,
        };

        let failure = match attempt {
            Ok(Ok(())) => {
                info!(url = %target.url, "push transport connected");
                if !emit(&events, TransportEvent::StatusChanged(ConnectionState::Connected)).await {
                    break;
                }
                match receive(&mut transport, &settings, &events, &cancel).await {
                    ReceiveEnd::Cancelled => break,
                    ReceiveEnd::Failed(reason) => reason,
                }
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("connect timed out after {:?}", settings.connect_timeout),
        };

        warn!(url = %target.url, reason = %failure, "push transport failed");
        let _ = transport.disconnect().await;
        if !emit(&events, TransportEvent::StatusChanged(ConnectionState::Error)).await {
            break;
        }

        // Reconnection is manual
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = retry.notified() => debug!("push transport retry requested"),
        }
    }

    let _ = transport.disconnect().await;
    debug!(url = %target.url, "push transport released");
}

async fn receive<T: Transport>(
    transport: &mut T,
    settings: &ConnectionSettings,
    events: &mpsc::Sender<TransportEvent>,
    cancel: &CancellationToken,
) -> ReceiveEnd {
    let mut heartbeat = settings.heartbeat_interval.map(|period| {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });
    let mut last_frame = Instant::now();

    loop {
        let idle_deadline = settings.idle_timeout.map(|timeout| last_frame + timeout);

        tokio::select! {
            _ = cancel.cancelled() => return ReceiveEnd::Cancelled,
            received = transport.recv() => match received {
                Ok(Some(inbound)) => {
                    last_frame = Instant::now();
                    if let Inbound::Text(text) = inbound {
                        if !dispatch(&text, events).await {
                            return ReceiveEnd::Cancelled;
                        }
                    }
                }
                Ok(None) => return ReceiveEnd::Failed("connection closed".to_string()),
                Err(e) => return ReceiveEnd::Failed(e.to_string()),
            },
            _ = next_tick(&mut heartbeat) => {
                if let Err(e) = transport.ping().await {
                    return ReceiveEnd::Failed(e.to_string());
                }
            }
            _ = idle(idle_deadline) => {
                return ReceiveEnd::Failed("no frames before idle timeout".to_string());
            }
        }
    }
}

/// Decodes one frame and forwards it. Returns false once the session is gone.
async fn dispatch(text: &str, events: &mpsc::Sender<TransportEvent>) -> bool {
    let envelope = match Frame::decode(text) {
        Ok(Frame::Envelope(envelope)) => envelope,
        Ok(Frame::Unrecognized(kind)) => {
            warn!(kind = %kind, "dropping unrecognized push frame");
            return true;
        }
        Err(e) => {
            warn!(error = %e, "dropping malformed push frame");
            return true;
        }
    };

    let event = match envelope {
        Envelope::ChatStatus { status } => {
            debug!(%status, "chat status");
            return true;
        }
        Envelope::ChatMessage { payload } => TransportEvent::MessageReceived {
            chat_id: payload.chat_id,
            message: payload.message.into(),
        },
        Envelope::MessageStatus { data } => TransportEvent::MessageStatusChanged {
            id: data.message_id,
            status: data.status,
        },
        Envelope::PresenceUpdate { payload } => TransportEvent::PresenceChanged {
            peer_id: payload.agent_id,
            state: payload.status,
        },
    };
    emit(events, event).await
}

async fn emit(events: &mpsc::Sender<TransportEvent>, event: TransportEvent) -> bool {
    events.send(event).await.is_ok()
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn idle(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
