// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::*;
use chrono::{TimeZone, Utc};
use parley_core::{Attachment, ClientToken, MessageId};

fn peer(id: &str, status: MessageStatus) -> Message {
    Message::confirmed(
        MessageId::new(id),
        Origin::RemotePeer,
        "hola",
        status,
        Utc.with_ymd_and_hms(2026, 1, 1, 9, 30, 5).unwrap(),
    )
}

#[test]
fn test_format_message() {
    assert_eq!(
        format_message(&peer("m1", MessageStatus::Sent)),
        "[09:30:05] peer   hola (sent)"
    );
}

#[test]
fn test_format_message_with_attachment() {
    let message = peer("m1", MessageStatus::Read).with_attachments(vec![Attachment {
        file_name: "plan.pdf".into(),
        file_type: "application/pdf".into(),
        file_size: 10,
        storage_url: "https://files.test/plan.pdf".into(),
        storage_path: None,
    }]);
    assert_eq!(
        format_message(&message),
        "[09:30:05] peer   hola <plan.pdf> (read)"
    );
}

#[test]
fn test_printer_reports_new_entries_and_status_changes_once() {
    let mut printer = LogPrinter::new();
    assert_eq!(printer.changes(&[peer("m1", MessageStatus::Sent)]).len(), 1);
    assert!(printer.changes(&[peer("m1", MessageStatus::Sent)]).is_empty());

    let lines = printer.changes(&[
        peer("m1", MessageStatus::Delivered),
        peer("m2", MessageStatus::Sent),
    ]);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("(delivered)"));
}

#[test]
fn test_printer_reports_promotion() {
    let mut printer = LogPrinter::new();
    let queued = Message::optimistic(
        ClientToken::new("t1"),
        "hi",
        vec![],
        Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap(),
    );
    assert_eq!(printer.changes(&[queued]).len(), 1);

    let promoted = Message::confirmed(
        MessageId::new("m9"),
        Origin::LocalUser,
        "hi",
        MessageStatus::Sent,
        Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 1).unwrap(),
    )
    .with_client_token(ClientToken::new("t1"));
    let lines = printer.changes(&[promoted]);
    assert_eq!(lines, vec!["[09:00:01] me     hi (sent)".to_string()]);
}
