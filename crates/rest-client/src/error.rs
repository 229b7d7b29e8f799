use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RestError {
    /// Non-success status. `body` is kept verbatim so exchange error payloads can be decoded upstream.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    #[error("Request timeout")]
    Timeout,

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("JSON parse error: {0}")]
    Parse(String),

    /// HTTP 429, or 418 once the IP has been banned for ignoring 429s.
    #[error("Rate limited (HTTP {status}), retry after {retry_after_ms}ms")]
    RateLimited { status: u16, retry_after_ms: u64 },

    #[error("Request build error: {0}")]
    RequestBuild(String),
}

impl RestError {
    pub fn is_retryable(&self) -> bool {
        match self {
            RestError::Timeout | RestError::Connection(_) | RestError::RateLimited { .. } => true,
            RestError::HttpError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            RestError::RateLimited { retry_after_ms, .. } => {
                Some(Duration::from_millis(*retry_after_ms))
            }
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            RestError::HttpError { status, .. } | RestError::RateLimited { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RestError::Timeout
        } else if err.is_decode() {
            RestError::Parse(err.to_string())
        } else if err.is_builder() {
            RestError::RequestBuild(err.to_string())
        } else if let Some(status) = err.status() {
            RestError::HttpError {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            RestError::Connection(err.to_string())
        }
    }
}
