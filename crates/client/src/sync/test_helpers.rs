// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for sync module tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use parley_core::protocol::{Envelope, MessageRecord, SendRequest};
use parley_core::{Message, MessageId, MessageStatus, Origin};
use tokio::sync::{watch, Notify};
use tokio::time::Instant;

use super::backend::{Backend, BackendFuture, BackendResult, FetchQuery};
use super::connection::ConnectionSettings;
use super::session::{ChatSession, SessionSettings};
use super::transport_tests::{MockConnect, MockRemote, MockTransport};

/// Timestamp `secs` seconds after the epoch.
pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

/// Wire record for a peer message.
pub fn record(id: &str, secs: i64) -> MessageRecord {
    MessageRecord {
        id: MessageId::new(id),
        sender_type: Origin::RemotePeer,
        body: format!("body of {id}"),
        attachments: vec![],
        status: MessageStatus::Sent,
        created_at: ts(secs),
        client_token: None,
    }
}

/// Confirmed peer message as it lands in the log.
pub fn peer_message(id: &str, secs: i64) -> Message {
    record(id, secs).into()
}

/// Push frame carrying a peer message.
pub fn chat_message_frame(chat_id: &str, id: &str, secs: i64) -> String {
    Envelope::chat_message(chat_id, record(id, secs))
        .to_json()
        .unwrap()
}

/// Settings for tests: no heartbeat, no catch-up unless asked.
pub fn test_settings() -> SessionSettings {
    SessionSettings {
        push_url: "ws://chat.test/ws".to_string(),
        poll_interval: Duration::from_secs(4),
        poll_limit: 50,
        connection: ConnectionSettings {
            connect_timeout: Duration::from_secs(10),
            heartbeat_interval: None,
            idle_timeout: None,
        },
        catch_up_on_connect: false,
    }
}

/// Waits until the watched value satisfies `pred` and returns it.
pub async fn wait_for<T: Clone>(
    rx: &mut watch::Receiver<T>,
    pred: impl FnMut(&T) -> bool,
) -> T {
    tokio::time::timeout(Duration::from_secs(600), rx.wait_for(pred))
        .await
        .expect("timed out waiting for watch value")
        .expect("watch sender dropped")
        .clone()
}

/// Yields until `cond` holds.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(600), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("timed out waiting for condition");
}

/// Scripted in-memory backend.
///
/// Fetches and posts without a scripted result succeed: fetches return an
/// empty page and posts echo the request as a `sent` record.
#[derive(Default)]
pub struct MockBackend {
    fetches: Mutex<Vec<(Instant, FetchQuery)>>,
    fetch_results: Mutex<VecDeque<BackendResult<Vec<Message>>>>,
    posts: Mutex<Vec<SendRequest>>,
    post_results: Mutex<VecDeque<BackendResult<Message>>>,
    post_count: AtomicUsize,
    hold_fetches: AtomicBool,
    hold_posts: AtomicBool,
    release: Notify,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_fetch(&self, result: BackendResult<Vec<Message>>) {
        self.fetch_results.lock().unwrap().push_back(result);
    }

    pub fn push_post(&self, result: BackendResult<Message>) {
        self.post_results.lock().unwrap().push_back(result);
    }

    /// Fetch queries in issue order, with the virtual time they were issued.
    pub fn fetches(&self) -> Vec<(Instant, FetchQuery)> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }

    pub fn posts(&self) -> Vec<SendRequest> {
        self.posts.lock().unwrap().clone()
    }

    /// Makes every later fetch wait for [`release`](Self::release).
    pub fn hold_fetches(&self) {
        self.hold_fetches.store(true, Ordering::SeqCst);
    }

    /// Makes every later post wait for [`release`](Self::release).
    pub fn hold_posts(&self) {
        self.hold_posts.store(true, Ordering::SeqCst);
    }

    /// Lets held requests complete.
    pub fn release(&self) {
        self.hold_fetches.store(false, Ordering::SeqCst);
        self.hold_posts.store(false, Ordering::SeqCst);
        self.release.notify_waiters();
    }

    async fn wait_while(&self, held: &AtomicBool) {
        loop {
            let notified = self.release.notified();
            if !held.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }
}

impl Backend for MockBackend {
    fn fetch_messages(&self, query: FetchQuery) -> BackendFuture<'_, Vec<Message>> {
        Box::pin(async move {
            self.fetches
                .lock()
                .unwrap()
                .push((Instant::now(), query));
            self.wait_while(&self.hold_fetches).await;
            self.fetch_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(vec![]))
        })
    }

    fn post_message(&self, request: SendRequest) -> BackendFuture<'_, Message> {
        Box::pin(async move {
            self.posts.lock().unwrap().push(request.clone());
            self.wait_while(&self.hold_posts).await;
            let scripted = self.post_results.lock().unwrap().pop_front();
            scripted.unwrap_or_else(|| {
                let n = self.post_count.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(Message::confirmed(
                    MessageId::new(format!("srv-{n}")),
                    Origin::LocalUser,
                    request.body,
                    MessageStatus::Sent,
                    Utc::now(),
                )
                .with_client_token(request.client_token)
                .with_attachments(request.attachments))
            })
        })
    }
}

/// Opens session `c1` over a mock transport scripted with `script`.
pub fn open_session(
    script: &[MockConnect],
    settings: &SessionSettings,
) -> (ChatSession, MockRemote, Arc<MockBackend>) {
    let (transport, remote) = MockTransport::new();
    for connect in script {
        remote.script_connect(connect.clone());
    }
    let backend = MockBackend::new();
    let session =
        ChatSession::open("c1", Some("tok".into()), transport, backend.clone(), settings)
            .unwrap();
    (session, remote, backend)
}
