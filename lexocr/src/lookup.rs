//! Dictionary lookup for the chosen word
//!
//! A plain GET of `<base-url>/<word>`. Transport failures (timeouts,
//! refused connections) are retried immediately up to the configured bound;
//! an HTTP answer of any status ends the lookup.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::LookupConfig;
use crate::error::{LexError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LookupOutcome {
    Found { body: String, attempts: u32 },
    /// The service answered with something other than 200.
    Rejected { status: u16, attempts: u32 },
    /// Every attempt failed before an answer arrived.
    Unreachable { attempts: u32, last_error: String },
}

impl LookupOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, LookupOutcome::Found { .. })
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            LookupOutcome::Found { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            LookupOutcome::Found { attempts, .. }
            | LookupOutcome::Rejected { attempts, .. }
            | LookupOutcome::Unreachable { attempts, .. } => *attempts,
        }
    }
}

enum Fetched {
    Body(String),
    Status(StatusCode),
}

#[derive(Clone, Debug)]
pub struct LookupClient {
    client: Client,
    base_url: Url,
    max_attempts: u32,
}

impl LookupClient {
    pub fn new(config: &LookupConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(LexError::Validation(format!(
                "Lookup base URL cannot carry a path: {base_url}"
            )));
        }

        Ok(Self {
            client: build_client(Duration::from_secs(config.timeout_secs))?,
            base_url,
            max_attempts: config.max_attempts.max(1),
        })
    }

    /// Replace the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = build_client(timeout)?;
        Ok(self)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// `<base-url>/<word>` with the word percent-encoded as one path segment.
    pub fn url_for(&self, word: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                LexError::Validation(format!(
                    "Lookup base URL cannot carry a path: {}",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .push(word);
        Ok(url)
    }

    pub async fn lookup(&self, word: &str) -> LookupOutcome {
        let url = match self.url_for(word) {
            Ok(url) => url,
            Err(e) => {
                return LookupOutcome::Unreachable {
                    attempts: 0,
                    last_error: e.to_string(),
                }
            }
        };

        let mut last_error = String::new();
        for attempt in 1..=self.max_attempts {
            debug!(%url, attempt, "Fetching definition");

            match self.fetch(&url).await {
                Ok(Fetched::Body(body)) => {
                    info!(word, attempt, bytes = body.len(), "Definition fetched");
                    return LookupOutcome::Found {
                        body,
                        attempts: attempt,
                    };
                }
                Ok(Fetched::Status(status)) => {
                    warn!(word, attempt, status = status.as_u16(), "Lookup rejected");
                    return LookupOutcome::Rejected {
                        status: status.as_u16(),
                        attempts: attempt,
                    };
                }
                Err(e) => {
                    warn!(
                        word,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Lookup attempt failed"
                    );
                    last_error = e.to_string();
                }
            }
        }

        LookupOutcome::Unreachable {
            attempts: self.max_attempts,
            last_error,
        }
    }

    /// Any status other than 200 is returned before the body is read, so
    /// only transport errors on a 200 answer can lead to a retry.
    async fn fetch(&self, url: &Url) -> Result<Fetched> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Ok(Fetched::Status(status));
        }
        Ok(Fetched::Body(response.text().await?))
    }
}

fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LexError::Internal(format!("Failed to create HTTP client: {e}")))
}
