// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Real-time message synchronization for a two-party chat.
//!
//! Keeps a client's view of a conversation consistent with the backend over
//! a push transport that can silently die and a pull fallback that covers
//! for it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  events   ┌──────────────────────────┐
//! │  Transport   │──────────►│                          │
//! │  Connection  │           │       ChatSession        │   watch   ┌───────────┐
//! └──────────────┘           │   (single writer task)   │──────────►│  readers  │
//! ┌──────────────┐  batches  │                          │           └───────────┘
//! │   Polling    │──────────►│   MessageLog + Reconcile │
//! │   Fallback   │           │                          │
//! └──────────────┘           └──────────────────────────┘
//!                                        ▲
//! ┌──────────────┐       commands        │
//! │ SendPipeline │───────────────────────┘
//! └──────────────┘
//! ```
//!
//! # Features
//!
//! - WebSocket push transport with heartbeat and idle detection
//! - Cursor-based REST fallback while the push transport is down
//! - Optimistic sends promoted in place or rolled back
//! - Manual reconnection only, via an explicit retry
//! - Atomic teardown on chat switch; stale results are discarded
//! - Injectable transport and backend traits for testing

mod backend;
mod connection;
mod engine;
mod pipeline;
mod polling;
mod session;
mod transport;

pub use backend::{Backend, BackendError, BackendFuture, BackendResult, FetchQuery, HttpBackend};
pub use connection::{ConnectionSettings, TransportConnection, TransportEvent};
pub use engine::ChatEngine;
pub use pipeline::{SendError, SendPipeline};
pub use polling::{FetchKind, FetchedBatch, PollSource, PollingFallback};
pub use session::{ChatSession, LogView, SessionClosed, SessionHandle, SessionSettings};
pub use transport::{
    ConnectTarget, Inbound, Transport, TransportError, TransportResult, WebSocketTransport,
};

#[cfg(test)]
mod test_helpers;



#[cfg(test)]
mod engine_tests;

#[cfg(test)]
mod pipeline_tests;
