// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

#[parameterized(
    status = { Error::InvalidStatus("pending".into()), "invalid status: 'pending'" },
    origin = { Error::InvalidOrigin("bot".into()), "invalid sender type: 'bot'" },
    presence = { Error::InvalidPresence("idle".into()), "invalid presence: 'idle'" },
)]
fn error_messages_name_the_bad_value(err: Error, prefix: &str) {
    let msg = err.to_string();
    assert!(msg.starts_with(prefix), "unexpected message: {msg}");
    assert!(msg.contains("hint:"));
}

#[test]
fn empty_message_display() {
    assert_eq!(
        Error::EmptyMessage.to_string(),
        "message has neither a body nor attachments"
    );
}

#[test]
fn json_error_converts() {
    let err: Error = serde_json::from_str::<u32>("nope").unwrap_err().into();
    assert!(err.to_string().starts_with("json error:"));
}
