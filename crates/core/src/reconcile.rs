// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Merge messages into the log from any source.
//!
//! Merge rules:
//! - Known id: never inserted twice; status only moves forward and never
//!   reaches `failed`
//! - Confirmation for an unresolved client token: promoted in place
//! - Confirmation for a known id that also matches an unresolved token: the
//!   unresolved entry is absorbed into the known one
//! - Unresolved optimistic entry: at most one per client token
//! - Anything else: inserted near its `created_at` position
//!
//! All merge operations are idempotent and commutative.

use crate::log::MessageLog;
use crate::message::{ClientToken, Message, MessageId, MessageStatus};

/// What a single merge did to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// A new entry was appended.
    Inserted,
    /// An unresolved entry received its authoritative id.
    Promoted,
    /// A duplicate unresolved entry was folded into an existing one.
    Absorbed,
    /// An existing entry's status moved forward.
    Advanced,
    /// Nothing changed.
    Unchanged,
    /// The message had neither an id nor a client token.
    Rejected,
}

impl MergeOutcome {
    /// Returns true if the log was modified.
    pub fn changed(&self) -> bool {
        !matches!(self, MergeOutcome::Unchanged | MergeOutcome::Rejected)
    }
}

/// Trait for the mutation contract of the message log.
pub trait Reconcile {
    /// Merges one message.
    fn merge(&mut self, incoming: Message) -> MergeOutcome;

    /// Merges a batch in order.
    ///
    /// Returns the number of messages that changed the log.
    fn merge_all(&mut self, incoming: Vec<Message>) -> usize {
        let mut changed = 0;
        for message in incoming {
            if self.merge(message).changed() {
                changed += 1;
            }
        }
        changed
    }

    /// Moves a message's status forward. Regressions are ignored.
    ///
    /// Returns true if the status changed.
    fn apply_status(&mut self, id: &MessageId, status: MessageStatus) -> bool;

    /// Removes an unresolved optimistic entry.
    ///
    /// Resolved entries are never removed.
    fn rollback(&mut self, token: &ClientToken) -> Option<Message>;
}

impl Reconcile for MessageLog {
    fn merge(&mut self, incoming: Message) -> MergeOutcome {
        match (incoming.id.clone(), incoming.client_token.clone()) {
            (Some(id), token) => self.merge_confirmed(id, token, incoming),
            (None, Some(token)) => self.merge_optimistic(&token, incoming),
            (None, None) => MergeOutcome::Rejected,
        }
    }

    fn apply_status(&mut self, id: &MessageId, status: MessageStatus) -> bool {
        match self.key_for_id(id) {
            Some(key) => self.advance(key, status),
            None => false,
        }
    }

    fn rollback(&mut self, token: &ClientToken) -> Option<Message> {
        self.remove_pending(token)
    }
}

impl MessageLog {
    fn merge_confirmed(
        &mut self,
        id: MessageId,
        token: Option<ClientToken>,
        incoming: Message,
    ) -> MergeOutcome {
        if let Some(key) = self.key_for_id(&id) {
            // Push echo may have beaten the send response
            let absorbed = match token {
                Some(token) => {
                    let removed = self.remove_pending(&token).is_some();
                    if removed {
                        self.mark_promoted(token, id);
                    }
                    removed
                }
                None => false,
            };
            let advanced = self.advance(key, incoming.status);
            return if absorbed {
                MergeOutcome::Absorbed
            } else if advanced {
                MergeOutcome::Advanced
            } else {
                MergeOutcome::Unchanged
            };
        }

        if let Some(key) = token.as_ref().and_then(|t| self.pending_key(t)) {
            self.promote(key, id, incoming.status, incoming.created_at);
            return MergeOutcome::Promoted;
        }

        self.insert(incoming);
        MergeOutcome::Inserted
    }

    fn merge_optimistic(&mut self, token: &ClientToken, incoming: Message) -> MergeOutcome {
        if self.pending_key(token).is_some() || self.resolved_id(token).is_some() {
            return MergeOutcome::Unchanged;
        }
        self.insert(incoming);
        MergeOutcome::Inserted
    }
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
