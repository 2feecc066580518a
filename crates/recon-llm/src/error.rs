use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("rate limited by {service}")]
    RateLimited {
        service: &'static str,
        retry_after: Option<Duration>,
    },

    #[error("invalid response from {service}: {reason}")]
    InvalidResponse {
        service: &'static str,
        reason: String,
    },

    #[error("empty response from {service}")]
    EmptyResponse { service: &'static str },

    #[error("{0}")]
    Other(String),
}

impl LlmError {
    /// Transient failures worth another attempt: timeouts, connection errors,
    /// rate limiting and server-side (5xx) errors. Client errors and malformed
    /// responses are permanent.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status, .. } => *status >= 500,
            Self::RateLimited { .. } => true,
            Self::InvalidResponse { .. } | Self::EmptyResponse { .. } | Self::Other(_) => false,
        }
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout())
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;
