// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for optimistic sends.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use parley_core::{Attachment, ClientToken, Message, MessageId, MessageStatus, Origin};
use reqwest::StatusCode;
use yare::parameterized;

use super::backend::BackendError;
use super::pipeline::SendError;
use super::test_helpers::{open_session, test_settings, ts, wait_for};

fn server_record(id: &str, body: &str, secs: i64) -> Message {
    Message::confirmed(
        MessageId::new(id),
        Origin::LocalUser,
        body,
        MessageStatus::Sent,
        ts(secs),
    )
}

fn attachment() -> Attachment {
    Attachment {
        file_name: "plan.pdf".into(),
        file_type: "application/pdf".into(),
        file_size: 2048,
        storage_url: "https://files.test/plan.pdf".into(),
        storage_path: None,
    }
}

#[tokio::test(start_paused = true)]
async fn confirmed_send_promotes_same_slot() {
    let (session, _remote, backend) = open_session(&[], &test_settings());
    session.merge(vec![server_record("m1", "earlier", 1)]).await.unwrap();

    backend.hold_posts();
    backend.push_post(Ok(server_record("m9", "hi", 50)));
    let pipeline = session.pipeline().clone();
    let send = tokio::spawn(async move {
        pipeline
            .send("hi", vec![], Some(ClientToken::new("t1")))
            .await
    });

    let mut log = session.subscribe_log();
    let view = wait_for(&mut log, |v| v.messages.len() == 2).await;
    let queued = &view.messages[1];
    assert_eq!(queued.id, None);
    assert_eq!(queued.client_token, Some(ClientToken::new("t1")));
    assert_eq!(queued.status, MessageStatus::Queued);

    backend.release();
    let sent = send.await.unwrap().unwrap();
    assert_eq!(sent.id, Some(MessageId::new("m9")));

    let view = wait_for(&mut log, |v| v.messages.iter().all(|m| m.is_resolved())).await;
    assert_eq!(view.messages.len(), 2);
    let promoted = &view.messages[1];
    assert_eq!(promoted.id, Some(MessageId::new("m9")));
    assert_eq!(promoted.client_token, Some(ClientToken::new("t1")));
    assert_eq!(promoted.status, MessageStatus::Sent);
    assert_eq!(view.cursor, Some(ts(50)));
}

#[tokio::test(start_paused = true)]
async fn failed_send_rolls_back() {
    let (session, _remote, backend) = open_session(&[], &test_settings());
    backend.hold_posts();
    backend.push_post(Err(BackendError::UnexpectedStatus {
        status: StatusCode::BAD_GATEWAY,
        body: String::new(),
    }));
    let pipeline = session.pipeline().clone();
    let send = tokio::spawn(async move { pipeline.send("hi", vec![], None).await });

    let mut log = session.subscribe_log();
    let view = wait_for(&mut log, |v| v.messages.len() == 1).await;
    let token = view.messages[0].client_token.clone().unwrap();
    assert_eq!(view.messages[0].status, MessageStatus::Queued);

    backend.release();
    let result = send.await.unwrap();
    assert!(matches!(result, Err(SendError::Network(_))));

    let view = wait_for(&mut log, |v| v.messages.is_empty()).await;
    assert!(view.messages.iter().all(|m| m.client_token.as_ref() != Some(&token)));
    assert_eq!(backend.posts()[0].client_token, token);
}

#[tokio::test(start_paused = true)]
async fn rejected_send_surfaces_status() {
    let (session, _remote, backend) = open_session(&[], &test_settings());
    backend.push_post(Err(BackendError::Rejected {
        status: StatusCode::UNPROCESSABLE_ENTITY,
        body: "too long".into(),
    }));

    let result = session.send("hi", vec![], None).await;
    match result {
        Err(SendError::Rejected { status, body }) => {
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
            assert_eq!(body, "too long");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    let mut log = session.subscribe_log();
    wait_for(&mut log, |v| v.messages.is_empty()).await;
}

#[tokio::test(start_paused = true)]
async fn empty_message_is_rejected_before_network() {
    let (session, _remote, backend) = open_session(&[], &test_settings());
    let result = session.send("", vec![], None).await;
    assert!(matches!(result, Err(SendError::EmptyMessage)));
    assert!(backend.posts().is_empty());
    assert!(session.messages().is_empty());
}

#[tokio::test(start_paused = true)]
async fn attachment_only_message_is_sent() {
    let (session, _remote, backend) = open_session(&[], &test_settings());
    let sent = session.send("", vec![attachment()], None).await.unwrap();
    assert_eq!(sent.attachments, vec![attachment()]);
    assert_eq!(backend.posts()[0].attachments, vec![attachment()]);
}

#[tokio::test(start_paused = true)]
async fn duplicate_pending_token_is_refused() {
    let (session, _remote, backend) = open_session(&[], &test_settings());
    backend.hold_posts();
    let pipeline = session.pipeline().clone();
    let first = tokio::spawn(async move {
        pipeline
            .send("one", vec![], Some(ClientToken::new("t1")))
            .await
    });
    let mut log = session.subscribe_log();
    wait_for(&mut log, |v| v.messages.len() == 1).await;

    let second = session
        .send("two", vec![], Some(ClientToken::new("t1")))
        .await;
    assert!(matches!(second, Err(SendError::DuplicateToken(t)) if t.as_str() == "t1"));

    backend.release();
    first.await.unwrap().unwrap();
    assert_eq!(backend.posts().len(), 1);
    let view = wait_for(&mut log, |v| v.messages.iter().all(|m| m.is_resolved())).await;
    assert_eq!(view.messages.len(), 1);
    assert_eq!(view.messages[0].body, "one");
}

#[tokio::test(start_paused = true)]
async fn confirmed_token_is_not_reused() {
    let (session, _remote, backend) = open_session(&[], &test_settings());
    session
        .send("one", vec![], Some(ClientToken::new("t1")))
        .await
        .unwrap();

    let again = session
        .send("two", vec![], Some(ClientToken::new("t1")))
        .await;

    let err = again.unwrap_err();
    assert_eq!(err.to_string(), "client token t1 is already in use");
    assert_eq!(backend.posts().len(), 1);
    assert_eq!(session.messages().len(), 1);
}

#[parameterized(
    echo_with_token = { true },
    echo_without_token = { false },
)]
fn push_echo_before_response_leaves_one_entry(echo_has_token: bool) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .unwrap();
    runtime.block_on(async {
        let (session, _remote, backend) = open_session(&[], &test_settings());
        backend.hold_posts();
        backend.push_post(Ok(server_record("m9", "hi", 50)));
        let pipeline = session.pipeline().clone();
        let send = tokio::spawn(async move {
            pipeline
                .send("hi", vec![], Some(ClientToken::new("t1")))
                .await
        });
        let mut log = session.subscribe_log();
        wait_for(&mut log, |v| v.messages.len() == 1).await;

        let mut echo = server_record("m9", "hi", 50);
        if echo_has_token {
            echo = echo.with_client_token(ClientToken::new("t1"));
        }
        session.merge(vec![echo]).await.unwrap();

        backend.release();
        send.await.unwrap().unwrap();

        let view = wait_for(&mut log, |v| v.messages.iter().all(|m| m.is_resolved())).await;
        assert_eq!(view.messages.len(), 1);
        assert_eq!(view.messages[0].id, Some(MessageId::new("m9")));
    });
}

#[tokio::test(start_paused = true)]
async fn closing_session_cancels_send() {
    let (session, _remote, backend) = open_session(&[], &test_settings());
    backend.hold_posts();
    let pipeline = session.pipeline().clone();
    let send = tokio::spawn(async move { pipeline.send("hi", vec![], None).await });
    let mut log = session.subscribe_log();
    wait_for(&mut log, |v| v.messages.len() == 1).await;

    session.close().await;

    let result = send.await.unwrap();
    assert!(matches!(result, Err(SendError::Cancelled)));
}

#[test]
fn backend_errors_map_to_send_errors() {
    let rejected: SendError = BackendError::Rejected {
        status: StatusCode::BAD_REQUEST,
        body: String::new(),
    }
    .into();
    assert!(matches!(rejected, SendError::Rejected { status, .. } if status == StatusCode::BAD_REQUEST));

    let network: SendError = BackendError::InvalidUrl("x".into()).into();
    assert!(matches!(network, SendError::Network(BackendError::InvalidUrl(_))));
}
