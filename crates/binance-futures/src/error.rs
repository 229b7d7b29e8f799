use connector_core::GatewayError;
use rest_client::RestError;
use thiserror::Error;

const DEFAULT_RATE_LIMIT_BACKOFF_MS: u64 = 60_000;

#[derive(Debug, Error)]
pub enum BinanceFuturesError {
    /// Transport-level failure (network, timeout, undecodable HTTP error).
    #[error("REST client error: {0}")]
    Rest(#[from] RestError),

    /// Structured `{"code": .., "msg": ..}` error from the exchange.
    #[error("Binance API error {code} (HTTP {status}): {message}")]
    Api {
        status: u16,
        code: i64,
        message: String,
    },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl BinanceFuturesError {
    /// Lift an HTTP error carrying a Binance error body into [`BinanceFuturesError::Api`].
    pub fn from_rest(err: RestError) -> Self {
        #[derive(serde::Deserialize)]
        struct ApiErrorBody {
            code: i64,
            msg: String,
        }

        if let RestError::HttpError { status, body } = &err {
            if let Ok(api) = serde_json::from_str::<ApiErrorBody>(body) {
                return Self::Api {
                    status: *status,
                    code: api.code,
                    message: api.msg,
                };
            }
        }
        Self::Rest(err)
    }

    pub fn api_code(&self) -> Option<i64> {
        match self {
            Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Request timestamp fell outside `recvWindow`; the local clock offset is stale.
    pub fn is_timestamp_drift(&self) -> bool {
        self.api_code() == Some(-1021)
    }

    /// Map onto the gateway taxonomy. `symbol` names the instrument for `UnknownSymbol`.
    pub fn classify(&self, symbol: &str) -> GatewayError {
        match self {
            Self::Rest(rest) => match rest {
                RestError::RateLimited { retry_after_ms, .. } => GatewayError::RateLimit {
                    retry_after_ms: *retry_after_ms,
                },
                RestError::Timeout | RestError::Connection(_) => {
                    GatewayError::Network(rest.to_string())
                }
                RestError::HttpError { status, .. } if *status >= 500 => {
                    GatewayError::Network(rest.to_string())
                }
                RestError::HttpError { status, .. } if *status == 401 || *status == 403 => {
                    GatewayError::Auth(rest.to_string())
                }
                _ => GatewayError::Unknown(rest.to_string()),
            },
            Self::Api {
                status,
                code,
                message,
            } => match *code {
                -1022 | -2014 | -2015 => GatewayError::Auth(message.clone()),
                _ if *status == 401 => GatewayError::Auth(message.clone()),
                -1003 => GatewayError::RateLimit {
                    retry_after_ms: DEFAULT_RATE_LIMIT_BACKOFF_MS,
                },
                -1000 | -1001 | -1007 | -1021 => GatewayError::Network(message.clone()),
                _ if *status >= 500 => GatewayError::Network(message.clone()),
                -1121 => GatewayError::UnknownSymbol(symbol.to_string()),
                code => GatewayError::Rejection {
                    code,
                    message: message.clone(),
                },
            },
            Self::Parse(msg) => GatewayError::Unknown(msg.clone()),
        }
    }

    /// Same as [`Self::classify`], except "unknown order" on a cancel means the order is already gone.
    pub fn classify_cancel(&self, symbol: &str, order_id: u64) -> GatewayError {
        match self.api_code() {
            Some(-2011) => GatewayError::AlreadyClosed { order_id },
            _ => self.classify(symbol),
        }
    }
}
