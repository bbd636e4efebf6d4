// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Plain-line rendering of log entries.

use std::collections::HashMap;

use parley_core::{Message, MessageStatus, Origin};

/// Formats one log entry as a single line.
pub fn format_message(message: &Message) -> String {
    let sender = match message.origin {
        Origin::LocalUser => "me",
        Origin::RemotePeer => "peer",
        Origin::System => "system",
    };
    let mut line = format!(
        "[{}] {:<6} {}",
        message.created_at.format("%H:%M:%S"),
        sender,
        message.body
    );
    for attachment in &message.attachments {
        line.push_str(&format!(" <{}>", attachment.file_name));
    }
    line.push_str(&format!(" ({})", message.status));
    line
}

/// Tracks what has been printed so each change is printed once.
#[derive(Default)]
pub struct LogPrinter {
    seen: HashMap<String, MessageStatus>,
}

impl LogPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns lines for entries that are new or whose status changed.
    pub fn changes(&mut self, messages: &[Message]) -> Vec<String> {
        let mut lines = Vec::new();
        for message in messages {
            let key = entry_key(message);
            if self.seen.get(&key) != Some(&message.status) {
                self.seen.insert(key, message.status);
                lines.push(format_message(message));
            }
        }
        lines
    }
}

fn entry_key(message: &Message) -> String {
    match (&message.id, &message.client_token) {
        (Some(id), _) => format!("id:{id}"),
        (None, Some(token)) => format!("token:{token}"),
        (None, None) => String::new(),
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
