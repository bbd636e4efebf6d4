// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use super::output::LogPrinter;
use crate::config::Config;
use crate::error::Result;

const RETRY_COMMAND: &str = "/retry";

/// Follows `chat` until Ctrl-C.
///
/// Lines read from stdin are sent as messages; `/retry` reconnects the push
/// transport after a failure.
pub async fn run(config: &Config, token: Option<String>, chat: String) -> Result<()> {
    let mut engine = super::engine(config, token.clone())?;
    let session = engine.switch_chat(chat, token).await?;

    let mut log = session.subscribe_log();
    let mut state = session.subscribe_state();
    let mut presence = session.subscribe_presence();
    let mut printer = LogPrinter::new();
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    println!("-- {} ({})", session.chat_id(), session.connection_state());
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = log.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = log.borrow_and_update().clone();
                for line in printer.changes(&view.messages) {
                    println!("{line}");
                }
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *state.borrow_and_update();
                if current.needs_fallback() {
                    println!("-- {current}: polling for messages, type {RETRY_COMMAND} to reconnect");
                } else {
                    println!("-- {current}");
                }
            }
            changed = presence.changed() => {
                if changed.is_err() {
                    break;
                }
                let peers = presence.borrow_and_update().clone();
                for (peer, status) in peers {
                    println!("-- {peer} is {status}");
                }
            }
            line = input.next_line(), if input_open => match line? {
                Some(line) => {
                    let line = line.trim().to_string();
                    if line == RETRY_COMMAND {
                        session.retry().await?;
                    } else if !line.is_empty() {
                        let pipeline = session.pipeline().clone();
                        tokio::spawn(async move {
                            if let Err(e) = pipeline.send(line, vec![], None).await {
                                warn!(error = %e, "send failed");
                                eprintln!("send failed: {e}");
                            }
                        });
                    }
                }
                None => input_open = false,
            },
        }
    }

    engine.close().await;
    Ok(())
}
