// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Ordered message log with id and client-token indexes.
//!
//! Entries live in a keyed store; `order` lists their keys sorted by
//! `created_at`, ties broken by insertion order. Two indexes point into the
//! same store:
//! - `by_id`: every entry carrying an authoritative id
//! - `pending`: unresolved optimistic entries, by client token
//!
//! Mutation goes through [`Reconcile`](crate::reconcile::Reconcile); this
//! module only keeps the indexes consistent.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::message::{ClientToken, Message, MessageId, MessageStatus};

/// Stable handle to a log entry. Also the insertion sequence number.
type EntryKey = u64;

/// The chat log of a single session.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    entries: HashMap<EntryKey, Message>,
    order: Vec<EntryKey>,
    by_id: HashMap<MessageId, EntryKey>,
    pending: HashMap<ClientToken, EntryKey>,
    /// Tokens already promoted, and the id they resolved to.
    promoted: HashMap<ClientToken, MessageId>,
    /// Newest `created_at` among entries with an authoritative id.
    cursor: Option<DateTime<Utc>>,
    next_key: EntryKey,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterates entries in log order.
    pub fn iter(&self) -> impl Iterator<Item = &Message> + '_ {
        self.order.iter().filter_map(|key| self.entries.get(key))
    }

    /// Clones the entries in log order.
    pub fn to_vec(&self) -> Vec<Message> {
        self.iter().cloned().collect()
    }

    /// Looks up an entry by authoritative id.
    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.by_id.get(id).and_then(|key| self.entries.get(key))
    }

    /// Looks up an unresolved entry by client token.
    pub fn get_pending(&self, token: &ClientToken) -> Option<&Message> {
        self.pending.get(token).and_then(|key| self.entries.get(key))
    }

    pub fn contains_id(&self, id: &MessageId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Number of unresolved optimistic entries.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Returns the id a token was promoted to, if it has been.
    pub fn resolved_id(&self, token: &ClientToken) -> Option<&MessageId> {
        self.promoted.get(token)
    }

    /// The fallback poll cursor: newest `created_at` among resolved entries.
    ///
    /// Unresolved entries carry client-clock timestamps and never move it.
    pub fn cursor(&self) -> Option<DateTime<Utc>> {
        self.cursor
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.by_id.clear();
        self.pending.clear();
        self.promoted.clear();
        self.cursor = None;
    }

    pub(crate) fn key_for_id(&self, id: &MessageId) -> Option<EntryKey> {
        self.by_id.get(id).copied()
    }

    pub(crate) fn pending_key(&self, token: &ClientToken) -> Option<EntryKey> {
        self.pending.get(token).copied()
    }

    /// Inserts a new entry near its `created_at` position.
    ///
    /// The log is nearly ordered, so the position is found by scanning back
    /// from the tail rather than re-sorting.
    pub(crate) fn insert(&mut self, mut message: Message) -> EntryKey {
        if message.id.is_some() && message.status == MessageStatus::Failed {
            message.status = MessageStatus::Sent;
        }
        let key = self.next_key;
        self.next_key += 1;

        let mut pos = self.order.len();
        while pos > 0 {
            match self.entries.get(&self.order[pos - 1]) {
                Some(prev) if prev.created_at > message.created_at => pos -= 1,
                _ => break,
            }
        }
        self.order.insert(pos, key);

        match (&message.id, &message.client_token) {
            (Some(id), _) => {
                self.by_id.insert(id.clone(), key);
                self.advance_cursor(message.created_at);
            }
            (None, Some(token)) => {
                self.pending.insert(token.clone(), key);
            }
            (None, None) => {}
        }
        self.entries.insert(key, message);
        key
    }

    /// Moves an entry's status forward. Returns false for regressions.
    ///
    /// An entry with an authoritative id reached the server and never
    /// becomes `failed`.
    pub(crate) fn advance(&mut self, key: EntryKey, status: MessageStatus) -> bool {
        match self.entries.get_mut(&key) {
            Some(entry) if entry.id.is_some() && status == MessageStatus::Failed => false,
            Some(entry) if entry.status.can_advance_to(status) => {
                entry.status = status;
                true
            }
            _ => false,
        }
    }

    /// Resolves an unresolved entry to its authoritative id, in place.
    ///
    /// The status becomes at least `sent` and the server timestamp is adopted;
    /// the entry keeps its position in the log.
    pub(crate) fn promote(
        &mut self,
        key: EntryKey,
        id: MessageId,
        status: MessageStatus,
        created_at: DateTime<Utc>,
    ) {
        let Some(entry) = self.entries.get_mut(&key) else {
            return;
        };
        entry.id = Some(id.clone());
        entry.status = [entry.status, status]
            .into_iter()
            .filter(|s| *s != MessageStatus::Failed)
            .fold(MessageStatus::Sent, MessageStatus::furthest);
        entry.created_at = created_at;

        if let Some(token) = entry.client_token.clone() {
            self.pending.remove(&token);
            self.promoted.insert(token, id.clone());
        }
        self.by_id.insert(id, key);
        self.advance_cursor(created_at);
    }

    /// Records that `token` resolved to `id` without touching any entry.
    pub(crate) fn mark_promoted(&mut self, token: ClientToken, id: MessageId) {
        self.promoted.insert(token, id);
    }

    /// Removes an unresolved entry and returns it.
    pub(crate) fn remove_pending(&mut self, token: &ClientToken) -> Option<Message> {
        let key = self.pending.remove(token)?;
        self.order.retain(|k| *k != key);
        self.entries.remove(&key)
    }

    fn advance_cursor(&mut self, created_at: DateTime<Utc>) {
        if self.cursor.map_or(true, |cursor| created_at > cursor) {
            self.cursor = Some(created_at);
        }
    }
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
