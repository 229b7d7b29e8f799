//! Process configuration from the environment.

use auth::AuthError;
use binance_futures::BinanceFuturesError;
use common::BinanceEnvironment;
use connector_core::GatewayConfig;
use std::path::PathBuf;
use std::time::Duration;
use strategy_core::DEFAULT_METADATA_TTL;
use thiserror::Error;

const METADATA_TTL_VAR: &str = "METADATA_TTL_SECS";
const RECV_WINDOW_VAR: &str = "RECV_WINDOW_MS";
const LOG_FILE_VAR: &str = "LOG_FILE";

/// Binance rejects a larger `recvWindow`.
const MAX_RECV_WINDOW_MS: u64 = 60_000;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid {var}: '{value}' ({reason})")]
    InvalidVar {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("credentials: {0}")]
    Auth(#[from] AuthError),

    #[error("gateway setup: {0}")]
    Gateway(#[from] BinanceFuturesError),
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub environment: BinanceEnvironment,
    pub metadata_ttl: Duration,
    pub recv_window_ms: u64,
    pub log_file: Option<PathBuf>,
}

impl RunnerConfig {
    pub fn from_env() -> Result<Self, StartupError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, StartupError> {
        let metadata_ttl = match lookup(METADATA_TTL_VAR) {
            Some(raw) => Duration::from_secs(parse_u64(METADATA_TTL_VAR, &raw)?),
            None => DEFAULT_METADATA_TTL,
        };

        let recv_window_ms = match lookup(RECV_WINDOW_VAR) {
            Some(raw) => parse_u64(RECV_WINDOW_VAR, &raw)?,
            None => GatewayConfig::default().recv_window_ms,
        };
        if recv_window_ms == 0 || recv_window_ms > MAX_RECV_WINDOW_MS {
            return Err(StartupError::InvalidVar {
                var: RECV_WINDOW_VAR,
                value: recv_window_ms.to_string(),
                reason: format!("must be between 1 and {}", MAX_RECV_WINDOW_MS),
            });
        }

        Ok(Self {
            environment: BinanceEnvironment::from_env(),
            metadata_ttl,
            recv_window_ms,
            log_file: lookup(LOG_FILE_VAR)
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
        })
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            environment: self.environment,
            recv_window_ms: self.recv_window_ms,
            ..GatewayConfig::default()
        }
    }
}

fn parse_u64(var: &'static str, raw: &str) -> Result<u64, StartupError> {
    raw.trim()
        .parse()
        .map_err(|e: std::num::ParseIntError| StartupError::InvalidVar {
            var,
            value: raw.to_string(),
            reason: e.to_string(),
        })
}
