// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for chat switching.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use parley_core::ConnectionState;

use super::engine::ChatEngine;
use super::test_helpers::{peer_message, test_settings, wait_for, wait_until, MockBackend};
use super::transport_tests::{MockConnect, MockRemote, MockTransport};

type Remotes = Arc<Mutex<Vec<MockRemote>>>;

/// Engine whose first connect is refused; later connects succeed.
fn engine(backend: Arc<MockBackend>) -> (ChatEngine<MockTransport>, Remotes) {
    let remotes: Remotes = Arc::new(Mutex::new(Vec::new()));
    let created = Arc::clone(&remotes);
    let engine = ChatEngine::with_transport(test_settings(), backend, move || {
        let (transport, remote) = MockTransport::new();
        let mut created = created.lock().unwrap();
        if created.is_empty() {
            remote.script_connect(MockConnect::Fail("refused".into()));
        }
        created.push(remote);
        transport
    });
    (engine, remotes)
}

#[tokio::test(start_paused = true)]
async fn starts_without_active_chat() {
    let (engine, remotes) = engine(MockBackend::new());
    assert!(engine.active().is_none());
    assert!(remotes.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn switch_discards_in_flight_poll_for_previous_chat() {
    let backend = MockBackend::new();
    let (mut engine, remotes) = engine(backend.clone());

    let first = engine.switch_chat("c1", None).await.unwrap();
    let mut old_log = first.subscribe_log();
    let old_handle = first.handle();

    backend.hold_fetches();
    backend.push_fetch(Ok(vec![peer_message("m1", 1)]));
    let b = backend.clone();
    wait_until(|| b.fetch_count() == 1).await;
    assert_eq!(backend.fetches()[0].1.chat_id, "c1");

    let second = engine.switch_chat("c2", None).await.unwrap();
    assert_eq!(second.chat_id(), "c2");
    assert!(old_handle.is_closed());
    assert!(remotes.lock().unwrap()[0].disconnect_count() >= 1);

    // The c1 poll resolves after the switch
    backend.release();
    let mut state = second.subscribe_state();
    wait_for(&mut state, |s| *s == ConnectionState::Connected).await;
    tokio::time::sleep(Duration::from_secs(30)).await;

    let active = engine.active().unwrap();
    assert_eq!(active.chat_id(), "c2");
    assert!(active.messages().is_empty());
    assert!(!active.is_polling());
    assert!(old_log.borrow_and_update().messages.is_empty());
    assert_eq!(backend.fetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn switch_targets_new_chat() {
    let backend = MockBackend::new();
    let (mut engine, remotes) = engine(backend);

    engine.switch_chat("c1", Some("tok".into())).await.unwrap();
    engine.switch_chat("c2", Some("tok".into())).await.unwrap();

    let remotes = remotes.lock().unwrap().clone();
    assert_eq!(remotes.len(), 2);
    let target = &remotes[1].targets()[0];
    assert_eq!(target.url, "ws://chat.test/ws?chatId=c2");
    assert_eq!(target.auth_token.as_deref(), Some("tok"));
}

#[tokio::test(start_paused = true)]
async fn close_tears_down_active_chat() {
    let backend = MockBackend::new();
    let (mut engine, remotes) = engine(backend);
    let session = engine.switch_chat("c1", None).await.unwrap();
    let handle = session.handle();

    engine.close().await;

    assert!(engine.active().is_none());
    assert!(handle.is_closed());
    assert!(remotes.lock().unwrap()[0].disconnect_count() >= 1);
}
