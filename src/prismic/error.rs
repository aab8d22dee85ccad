//! Errors raised by the Prismic client

use thiserror::Error;

/// Failure talking to the Prismic REST API
#[derive(Debug, Error)]
pub enum PrismicError {
    /// The configured endpoint is not an absolute http(s) URL
    #[error("invalid Prismic endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// Transport-level failure (DNS, TLS, timeout, connection reset)
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The body did not match the expected response shape
    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The API root listed no ref flagged as master
    #[error("the repository at {0} exposes no master ref")]
    NoMasterRef(String),
}

impl PrismicError {
    /// Whether the failure is a 404 from the API
    pub fn is_not_found(&self) -> bool {
        matches!(self, PrismicError::Status { status: 404, .. })
    }
}
