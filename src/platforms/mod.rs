//! Platform integrations.
//!
//! Defines the `GammaTransport` trait used to reach the Polymarket Gamma API
//! and the error type shared by the market query layer. The production
//! transport is `HttpTransport`; tests substitute a mock.

pub mod polymarket;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Public Gamma API endpoint (no auth required).
pub const GAMMA_API_URL: &str = "https://gamma-api.polymarket.com";

/// Longest slice of an error response body carried in `Status`.
pub const MAX_ERROR_BODY_CHARS: usize = 300;

/// Failure while querying the market data service.
#[derive(Debug, Error)]
pub enum MarketQueryError {
    /// The request could not be sent or the body could not be read.
    #[error("request failed: {0}")]
    Transport(String),

    /// The service answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The body was not the JSON shape we expected.
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for MarketQueryError {
    fn from(e: reqwest::Error) -> Self {
        MarketQueryError::Transport(e.to_string())
    }
}

/// Abstraction over the HTTP hop to the Gamma API.
///
/// `path` is relative to the configured base endpoint and starts with `/`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GammaTransport: Send + Sync {
    async fn get_json(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Value, MarketQueryError>;
}

/// `reqwest`-backed transport bound to one base endpoint.
///
/// The underlying client pools connections; each response is dropped (and its
/// connection returned) before `get_json` returns, whatever the outcome.
#[derive(Clone)]
pub struct HttpTransport {
    http: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> anyhow::Result<Self> {
        use anyhow::Context;

        let mut builder = Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let http = builder
            .build()
            .context("Failed to build Gamma HTTP client")?;

        Ok(Self::with_client(http, base_url))
    }

    /// Bind an existing HTTP client to `base_url`.
    pub fn with_client(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl GammaTransport for HttpTransport {
    async fn get_json(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Value, MarketQueryError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, params = query.len(), "Gamma API request");

        let resp = self.http.get(&url).query(query).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MarketQueryError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn truncate_body(body: &str) -> String {
    let mut chars = body.chars();
    let head: String = chars.by_ref().take(MAX_ERROR_BODY_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
