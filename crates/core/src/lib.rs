// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! parley-core: Message model and reconciliation for parley chat sync.
//!
//! This crate holds the transport-free half of the sync engine: the message
//! model, the push/REST wire formats, and the ordered message log together
//! with the merge rules that keep it consistent. The async plumbing lives in
//! the `parley` crate.

pub mod connection;
pub mod error;
pub mod log;
pub mod message;
pub mod protocol;
pub mod reconcile;

pub use connection::{ConnectionState, PresenceState};
pub use error::{Error, Result};
pub use log::MessageLog;
pub use message::{Attachment, ClientToken, Message, MessageId, MessageStatus, Origin};
pub use protocol::{Envelope, Frame, FrameError, MessageRecord, SendRequest};
pub use reconcile::{MergeOutcome, Reconcile};
