// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use parley_core::ClientToken;

use super::output::format_message;
use crate::config::Config;
use crate::error::Result;

/// Sends one message to `chat` and prints the confirmed record.
pub async fn run(
    config: &Config,
    token: Option<String>,
    chat: String,
    body: String,
    client_token: Option<String>,
) -> Result<()> {
    let mut engine = super::engine(config, token.clone())?;
    let session = engine.switch_chat(chat, token).await?;
    let result = session
        .send(body, vec![], client_token.map(ClientToken::new))
        .await;
    engine.close().await;

    let message = result?;
    println!("{}", format_message(&message));
    Ok(())
}
