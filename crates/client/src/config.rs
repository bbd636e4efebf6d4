// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client configuration.
//!
//! Loaded from a TOML file named by `--config` or `PARLEY_CONFIG`. Every
//! field has a default, so an empty file (or no file) is a valid config.

use std::fs;
use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sync::{ConnectionSettings, SessionSettings};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "PARLEY_CONFIG";

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// REST base URL (default: `http://localhost:8080`).
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// WebSocket endpoint (default: `ws://localhost:8080/ws`).
    #[serde(default = "default_push_url")]
    pub push_url: String,
    /// Pull fallback period in milliseconds (default: 4000).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Page size of each fallback fetch (default: 50).
    #[serde(default = "default_poll_limit")]
    pub poll_limit: u32,
    /// Heartbeat ping interval in milliseconds (default: 30000). 0 = disabled.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Inbound silence that counts as a dead push session, in milliseconds.
    /// 0 = disabled (default).
    #[serde(default)]
    pub idle_timeout_ms: u64,
    /// Max time to wait for a push connect in seconds (default: 10).
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// REST request timeout in seconds (default: 15).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Fetch from the cursor once the push transport recovers (default: true).
    #[serde(default = "default_catch_up_on_connect")]
    pub catch_up_on_connect: bool,
}

fn default_api_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_push_url() -> String {
    "ws://localhost:8080/ws".to_string()
}

fn default_poll_interval_ms() -> u64 {
    4_000
}

fn default_poll_limit() -> u32 {
    50
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_catch_up_on_connect() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_url: default_api_url(),
            push_url: default_push_url(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_limit: default_poll_limit(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            idle_timeout_ms: 0,
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            catch_up_on_connect: default_catch_up_on_connect(),
        }
    }
}

impl Config {
    /// Loads and validates the config at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if given, otherwise returns the defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Config::default()),
        }
    }

    /// Checks URL schemes and that polling can make progress.
    pub fn validate(&self) -> Result<()> {
        check_scheme("push_url", &self.push_url, &["ws", "wss"])?;
        check_scheme("api_url", &self.api_url, &["http", "https"])?;
        if self.poll_interval_ms == 0 {
            return Err(Error::InvalidConfig {
                field: "poll_interval_ms",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.poll_limit == 0 {
            return Err(Error::InvalidConfig {
                field: "poll_limit",
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Session tunables derived from this config.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            push_url: self.push_url.clone(),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            poll_limit: self.poll_limit,
            connection: ConnectionSettings {
                connect_timeout: Duration::from_secs(self.connect_timeout_secs),
                heartbeat_interval: millis_or_disabled(self.heartbeat_interval_ms),
                idle_timeout: millis_or_disabled(self.idle_timeout_ms),
            },
            catch_up_on_connect: self.catch_up_on_connect,
        }
    }
}

fn millis_or_disabled(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

fn check_scheme(field: &'static str, url: &str, schemes: &[&str]) -> Result<()> {
    let parsed = Url::parse(url).map_err(|e| Error::InvalidConfig {
        field,
        reason: format!("'{}' is not a URL: {}", url, e),
    })?;
    if !schemes.contains(&parsed.scheme()) {
        return Err(Error::InvalidConfig {
            field,
            reason: format!(
                "'{}' must use one of: {}",
                url,
                schemes
                    .iter()
                    .map(|s| format!("{s}://"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
