use common::Retryable;
use std::time::Duration;
use thiserror::Error;

/// Failures surfaced by an [`crate::ExchangeGateway`].
///
/// `Network` and `RateLimit` have already been retried by the gateway when a caller sees them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Network(String),

    /// Credentials rejected. Fatal to whatever run observes it.
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimit { retry_after_ms: u64 },

    /// Exchange refused this specific order.
    #[error("order rejected ({code}): {message}")]
    Rejection { code: i64, message: String },

    /// Cancel target was already filled, canceled or expired.
    #[error("order {order_id} already closed")]
    AlreadyClosed { order_id: u64 },

    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("unexpected gateway error: {0}")]
    Unknown(String),
}

impl GatewayError {
    /// Short stable name for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Auth(_) => "auth",
            Self::RateLimit { .. } => "rate_limit",
            Self::Rejection { .. } => "rejection",
            Self::AlreadyClosed { .. } => "already_closed",
            Self::UnknownSymbol(_) => "unknown_symbol",
            Self::Unknown(_) => "unknown",
        }
    }

    /// Aborts the whole strategy run rather than one order attempt.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

impl Retryable for GatewayError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimit { .. })
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimit { retry_after_ms } => Some(Duration::from_millis(*retry_after_ms)),
            _ => None,
        }
    }
}
