//! External book-data lookup
//!
//! Thin client for the bibliographic search API behind the default
//! provider. Resolves an ISBN or a free-text title query to metadata
//! records. Transient upstream failures are retried a fixed number of
//! times with a fixed sleep in between; both are configuration values,
//! not hidden constants.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::domain::DomainError;

/// Clock seam so tests can run the retry loop without real sleeps.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone)]
pub enum LookupQuery {
    Isbn(String),
    Title {
        query: String,
        page: Option<u32>,
        sort: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupItem {
    pub isbn: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub contents: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub cover: Option<String>,
}

/// The caller-visible shapes of a completed lookup. Zero results, an
/// over-broad query, and a rejected request each drive different
/// behavior upstream, so they are distinguished here rather than
/// collapsed into one error.
#[derive(Debug)]
pub enum LookupOutcome {
    Found(Vec<LookupItem>),
    NoResults,
    TooManyResults,
    ClientError { status: u16, message: String },
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    count: Option<u64>,
    #[serde(default)]
    items: Vec<LookupItem>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Clone)]
pub struct BookLookupClient {
    http: reqwest::Client,
    endpoint: String,
    app_key: String,
    retry_count: u32,
    retry_interval: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl BookLookupClient {
    pub fn new(config: &Config, endpoint: String) -> Self {
        Self::with_sleeper(config, endpoint, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(config: &Config, endpoint: String, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            app_key: config.book_api_app_key.clone(),
            retry_count: config.lookup_retry_count.max(1),
            retry_interval: Duration::from_millis(config.lookup_retry_interval_ms),
            sleeper,
        }
    }

    pub async fn search(&self, query: &LookupQuery) -> Result<LookupOutcome, DomainError> {
        let mut params: Vec<(&str, String)> =
            vec![("applicationId", self.app_key.clone()), ("format", "json".to_string())];
        match query {
            LookupQuery::Isbn(isbn) => params.push(("isbn", format_isbn(isbn))),
            LookupQuery::Title { query, page, sort } => {
                params.push(("title", query.clone()));
                if let Some(page) = page {
                    params.push(("page", page.to_string()));
                }
                if let Some(sort) = sort {
                    params.push(("sort", sort.clone()));
                }
            }
        }

        let mut attempt = 0;
        let response = loop {
            let response = self
                .http
                .get(&self.endpoint)
                .query(&params)
                .send()
                .await
                .map_err(|e| DomainError::External(format!("Book API request failed: {}", e)))?;
            let status = response.status();
            if status.is_success() || status.is_client_error() {
                break response;
            }
            attempt += 1;
            if attempt >= self.retry_count {
                break response;
            }
            tracing::warn!(
                status = %status,
                attempt,
                "Book API returned a transient error, retrying"
            );
            self.sleeper.sleep(self.retry_interval).await;
        };

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DomainError::External(format!("Failed to read book API body: {}", e)))?;
        if body.trim().is_empty() {
            return Err(DomainError::External(format!(
                "Book API returned status {} with an empty body",
                status
            )));
        }

        if status.is_client_error() {
            let envelope: ApiEnvelope = serde_json::from_str(&body).unwrap_or(ApiEnvelope {
                count: None,
                items: Vec::new(),
                error: None,
                error_description: None,
            });
            if envelope.error.as_deref() == Some("too_many_results") {
                return Ok(LookupOutcome::TooManyResults);
            }
            return Ok(LookupOutcome::ClientError {
                status: status.as_u16(),
                message: envelope
                    .error_description
                    .or(envelope.error)
                    .unwrap_or_else(|| "bad request".to_string()),
            });
        }

        if status != StatusCode::OK {
            // Retries exhausted: surface the last response as-is.
            return Err(DomainError::External(format!(
                "Book API returned status {}",
                status
            )));
        }

        let envelope: ApiEnvelope = serde_json::from_str(&body)
            .map_err(|e| DomainError::External(format!("Failed to parse book API body: {}", e)))?;

        if envelope.count.unwrap_or(0) == 0 || envelope.items.is_empty() {
            return Ok(LookupOutcome::NoResults);
        }
        Ok(LookupOutcome::Found(envelope.items))
    }
}

/// ISBNs arrive hyphenated, with spaces, or pasted with labels; the API
/// wants bare digits.
pub fn format_isbn(isbn: &str) -> String {
    isbn.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Join title parts the way they are displayed: single-spaced, trimmed.
pub fn format_title(parts: &[&str]) -> String {
    let joined = parts.join(" ");
    let mut out = String::with_capacity(joined.len());
    let mut last_was_space = true;
    for c in joined.trim().chars() {
        if c == ' ' {
            if !last_was_space {
                out.push(c);
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out.trim_end().to_string()
}
