// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Pull fallback that covers for a failed push transport.
//!
//! While active, fetches once immediately and then on a fixed interval.
//! Every fetch reads the log's cursor at the moment it is issued, so polling
//! resumes wherever the log left off rather than where polling last ran.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parley_core::Message;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::backend::{Backend, FetchQuery};

/// Why a batch was fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// Periodic fetch while the push transport is down.
    Fallback,
    /// One-shot fetch after the push transport recovers.
    CatchUp,
}

/// Messages returned by one fetch, tagged with where they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedBatch {
    pub chat_id: String,
    pub kind: FetchKind,
    /// Fallback cycle that issued the fetch. Zero for catch-up fetches.
    pub cycle: u64,
    pub messages: Vec<Message>,
}

/// Everything a fetch needs, shared by every cycle of one session.
#[derive(Clone)]
pub struct PollSource {
    pub chat_id: String,
    pub backend: Arc<dyn Backend>,
    /// Latest `createdAt` among resolved log entries.
    pub cursor: watch::Receiver<Option<DateTime<Utc>>>,
    pub batches: mpsc::Sender<FetchedBatch>,
    /// Session token. Cancelling it stops every fetch.
    pub cancel: CancellationToken,
}

/// Owns at most one running poll loop.
///
/// Starting a new cycle cancels the previous one first, so two timers can
/// never run side by side.
pub struct PollingFallback {
    source: PollSource,
    interval: Duration,
    limit: u32,
    cycle: u64,
    running: Option<(CancellationToken, JoinHandle<()>)>,
}

impl PollingFallback {
    pub fn new(source: PollSource, interval: Duration, limit: u32) -> Self {
        PollingFallback {
            source,
            interval,
            limit,
            cycle: 0,
            running: None,
        }
    }

    /// Starts a new poll cycle, replacing any running one.
    pub fn start(&mut self) {
        self.stop();
        self.cycle += 1;
        let cancel = self.source.cancel.child_token();
        let task = tokio::spawn(run(
            self.source.clone(),
            self.interval,
            self.limit,
            self.cycle,
            cancel.clone(),
        ));
        info!(
            chat_id = %self.source.chat_id,
            cycle = self.cycle,
            interval = ?self.interval,
            "pull fallback started"
        );
        self.running = Some((cancel, task));
    }

    /// Stops the running cycle, if any.
    ///
    /// Batches the cycle already queued are rejected by [`is_current`](Self::is_current).
    pub fn stop(&mut self) {
        if let Some((cancel, task)) = self.running.take() {
            cancel.cancel();
            task.abort();
            info!(chat_id = %self.source.chat_id, cycle = self.cycle, "pull fallback stopped");
        }
    }

    pub fn is_active(&self) -> bool {
        self.running.is_some()
    }

    /// Returns true if `cycle` belongs to the running poll loop.
    pub fn is_current(&self, cycle: u64) -> bool {
        self.is_active() && cycle == self.cycle
    }

    /// Spawns a single fetch from the current cursor.
    pub fn catch_up(&self) {
        let source = self.source.clone();
        let limit = self.limit;
        tokio::spawn(async move {
            let cancel = source.cancel.clone();
            fetch_once(&source, limit, FetchKind::CatchUp, 0, &cancel).await;
        });
    }
}

impl Drop for PollingFallback {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run(
    source: PollSource,
    interval: Duration,
    limit: u32,
    cycle: u64,
    cancel: CancellationToken,
) {
    // First tick completes immediately
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        if !fetch_once(&source, limit, FetchKind::Fallback, cycle, &cancel).await {
            break;
        }
    }
    debug!(chat_id = %source.chat_id, cycle, "poll loop exited");
}

/// Runs one fetch. Returns false once the loop should stop.
async fn fetch_once(
    source: &PollSource,
    limit: u32,
    kind: FetchKind,
    cycle: u64,
    cancel: &CancellationToken,
) -> bool {
    let query = FetchQuery {
        chat_id: source.chat_id.clone(),
        after: *source.cursor.borrow(),
        limit,
    };
    debug!(chat_id = %query.chat_id, after = ?query.after, ?kind, "fetching messages");

    let result = tokio::select! {
        _ = cancel.cancelled() => return false,
        result = source.backend.fetch_messages(query) => result,
    };

    match result {
        Ok(messages) => {
            let batch = FetchedBatch {
                chat_id: source.chat_id.clone(),
                kind,
                cycle,
                messages,
            };
            tokio::select! {
                _ = cancel.cancelled() => false,
                sent = source.batches.send(batch) => sent.is_ok(),
            }
        }
        Err(e) => {
            // Retried on the next tick; connection state is left alone
            warn!(chat_id = %source.chat_id, error = %e, ?kind, "fetch failed");
            true
        }
    }
}
