// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! REST surface consumed by the pull fallback and the send pipeline.
//!
//! - `GET {api}/messages?chatId=&after=&limit=` returns messages newer than the cursor
//! - `POST {api}/messages` creates a message and returns the authoritative record

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use parley_core::protocol::{FetchResponse, MessageRecord, SendRequest};
use parley_core::Message;
use reqwest::{Client, Request, StatusCode, Url};

/// Error type for backend requests.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Transport-level HTTP failure.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server refused the request (4xx).
    #[error("request rejected: {status} body={body}")]
    Rejected { status: StatusCode, body: String },

    /// Any other non-success status.
    #[error("unexpected status: {status} body={body}")]
    UnexpectedStatus { status: StatusCode, body: String },

    /// The response body did not have the expected shape.
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The configured API URL is unusable.
    #[error("invalid api url: {0}")]
    InvalidUrl(String),
}

/// Result type for backend requests.
pub type BackendResult<T> = Result<T, BackendError>;

/// Boxed future returned by [`Backend`] methods.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = BackendResult<T>> + Send + 'a>>;

/// Parameters of one fallback fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchQuery {
    pub chat_id: String,
    /// Exclusive lower bound on `createdAt`. `None` fetches the latest page.
    pub after: Option<DateTime<Utc>>,
    pub limit: u32,
}

/// Request/response access to the chat backend.
pub trait Backend: Send + Sync {
    /// Fetch messages newer than `query.after`, oldest first.
    fn fetch_messages(&self, query: FetchQuery) -> BackendFuture<'_, Vec<Message>>;

    /// Create a message and return the authoritative record.
    fn post_message(&self, request: SendRequest) -> BackendFuture<'_, Message>;
}

/// [`Backend`] over HTTP using reqwest.
#[derive(Clone)]
pub struct HttpBackend {
    http: Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl HttpBackend {
    pub fn new(
        api_url: &str,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> BackendResult<Self> {
        let mut base_url =
            Url::parse(api_url).map_err(|e| BackendError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::InvalidUrl(api_url.to_string()));
        }
        // `join` replaces the last segment unless the path ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = Client::builder().timeout(timeout).build()?;
        Ok(HttpBackend {
            http,
            base_url,
            auth_token,
        })
    }

    fn messages_url(&self) -> BackendResult<Url> {
        self.base_url
            .join("messages")
            .map_err(|e| BackendError::InvalidUrl(e.to_string()))
    }

    /// Builds the fallback fetch request.
    pub fn fetch_request(&self, query: &FetchQuery) -> BackendResult<Request> {
        let mut builder = self
            .http
            .get(self.messages_url()?)
            .query(&[("chatId", query.chat_id.as_str())]);
        if let Some(after) = query.after {
            builder = builder.query(&[("after", after.to_rfc3339_opts(SecondsFormat::AutoSi, true))]);
        }
        builder = builder.query(&[("limit", query.limit)]);
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }
        Ok(builder.build()?)
    }

    /// Builds the send request.
    pub fn post_request(&self, request: &SendRequest) -> BackendResult<Request> {
        let mut builder = self.http.post(self.messages_url()?).json(request);
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }
        Ok(builder.build()?)
    }

    async fn execute(&self, request: Request) -> BackendResult<String> {
        let response = self.http.execute(request).await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status.is_success() {
            Ok(body)
        } else if status.is_client_error() {
            Err(BackendError::Rejected { status, body })
        } else {
            Err(BackendError::UnexpectedStatus { status, body })
        }
    }
}

impl Backend for HttpBackend {
    fn fetch_messages(&self, query: FetchQuery) -> BackendFuture<'_, Vec<Message>> {
        Box::pin(async move {
            let request = self.fetch_request(&query)?;
            let body = self.execute(request).await?;
            let response: FetchResponse = serde_json::from_str(&body)?;
            Ok(response.into_messages())
        })
    }

    fn post_message(&self, request: SendRequest) -> BackendFuture<'_, Message> {
        Box::pin(async move {
            let http_request = self.post_request(&request)?;
            let body = self.execute(http_request).await?;
            let record: MessageRecord = serde_json::from_str(&body)?;
            Ok(record.into())
        })
    }
}
