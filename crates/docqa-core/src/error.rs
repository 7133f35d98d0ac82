//! Errors produced while talking to the ingestion/query backend.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The request did not complete within the configured bound.
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The backend could not be reached at all.
    #[error("could not connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx response. `detail` is the backend's own message, if it sent one.
    #[error("backend returned {status}")]
    Backend {
        status: StatusCode,
        detail: Option<String>,
    },

    /// A 2xx response whose body was not the expected JSON.
    #[error("unexpected response body: {0}")]
    Decode(#[source] reqwest::Error),

    /// A pending file could not be read from disk.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The caller's cancellation token fired before the response arrived.
    #[error("request cancelled")]
    Cancelled,

    /// The background task driving the request died.
    #[error("request task failed: {0}")]
    Task(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ClientError {
    /// Classify a transport error from reqwest.
    pub(crate) fn from_reqwest(err: reqwest::Error, url: &str, timeout: Duration) -> Self {
        if err.is_timeout() {
            ClientError::Timeout(timeout)
        } else if err.is_connect() {
            ClientError::Connect {
                url: url.to_string(),
                source: err,
            }
        } else if err.is_decode() {
            ClientError::Decode(err)
        } else {
            ClientError::Http(err)
        }
    }

    /// Server-provided message, if the backend answered with one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ClientError::Backend { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Cancelled)
    }
}

/// Pull a string `detail` out of an error body. Anything else is ignored.
pub(crate) fn detail_from_body(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("detail")?
        .as_str()
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}
