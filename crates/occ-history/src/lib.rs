//! Presence history retrieval for the occupancy analyzer.
//!
//! Wraps the presence-history HTTP API and the JSON wire format it shares
//! with locally captured event files. The analysis core requires events
//! sorted by timestamp ascending; this layer owns that guarantee, so wire
//! data is sorted here before it is handed over.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use occ_core::{AnalysisError, PresenceEvent, Role, parse_timestamp, timestamp_from_millis};

/// Default request timeout for history API calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// History client errors.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// The provided base URL was invalid.
    #[error("invalid base URL: {reason}")]
    InvalidBaseUrl { reason: &'static str },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The history service returned an error response.
    #[error("history API error (status {status}): {message}")]
    Api { status: u16, message: String },
    /// The response body was not valid history JSON.
    #[error("invalid history body: {0}")]
    InvalidBody(String),
    /// An individual event record was malformed.
    #[error(transparent)]
    Event(#[from] AnalysisError),
}

/// One record as returned by the history service.
#[derive(Debug, Deserialize)]
struct WireEvent {
    role: Role,
    action: String,
    timestamp: WireTimestamp,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

/// Timestamps arrive either as epoch milliseconds or RFC 3339 text.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireTimestamp {
    Millis(i64),
    Text(String),
}

impl WireTimestamp {
    fn resolve(&self) -> Result<DateTime<Utc>, AnalysisError> {
        match self {
            Self::Millis(ms) => timestamp_from_millis(*ms),
            Self::Text(s) => parse_timestamp(s),
        }
    }
}

#[derive(Debug, Deserialize)]
struct HistoryBody {
    events: Vec<WireEvent>,
}

/// Parses a history body into chronologically ordered presence events.
///
/// Accepts the same `{"events": [...]}` format whether it came from the
/// history service or a locally captured file.
pub fn parse_history_body(body: &str) -> Result<Vec<PresenceEvent>, HistoryError> {
    let body: HistoryBody =
        serde_json::from_str(body).map_err(|err| HistoryError::InvalidBody(err.to_string()))?;

    let mut events = body
        .events
        .into_iter()
        .map(|wire| {
            let timestamp = wire.timestamp.resolve()?;
            Ok(PresenceEvent {
                role: wire.role,
                action: wire.action,
                timestamp,
                metadata: wire.metadata,
            })
        })
        .collect::<Result<Vec<_>, HistoryError>>()?;

    events.sort_by_key(|event| event.timestamp);
    Ok(events)
}

/// Presence history API client.
///
/// # Thread Safety
///
/// The client is safe to clone and share across threads. Each clone shares
/// the underlying HTTP connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a new client for the given history service.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is empty or whitespace-only, or if
    /// the HTTP client fails to build.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, HistoryError> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(HistoryError::InvalidBaseUrl {
                reason: "base URL cannot be empty",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(HistoryError::ClientBuild)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Fetches the presence events for a channel over `[start, end)`.
    ///
    /// Returned events are sorted by timestamp ascending, ready for the
    /// interval builder.
    pub async fn fetch_presence(
        &self,
        channel: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PresenceEvent>, HistoryError> {
        let url = format!("{}/v1/channels/{channel}/presence", self.base_url);
        let mut request = self.http.get(&url).query(&[
            ("start", start.timestamp_millis().to_string()),
            ("end", end.timestamp_millis().to_string()),
        ]);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(HistoryError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let events = parse_history_body(&body)?;
        tracing::debug!(channel, count = events.len(), "fetched presence history");
        Ok(events)
    }
}
