// src/fetch/error.rs

use crate::process::ParseError;

/// Failures talking to the course-schedule service.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("GET {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("GET {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("could not decode response from {url}: {reason}")]
    Decode { url: String, reason: String },
    #[error("unparseable schedule from {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: ParseError,
    },
    #[error("invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),
}

impl FetchError {
    /// Network errors, timeouts, non-2xx answers and garbled bodies are worth
    /// another attempt. A malformed endpoint never recovers.
    pub fn is_transient(&self) -> bool {
        !matches!(self, FetchError::Url(_))
    }
}
