//! Binance USDⓈ-M futures environment selection.

use std::fmt;
use std::str::FromStr;

/// Which futures cluster orders are routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinanceEnvironment {
    /// Live futures trading (real funds).
    Production,
    /// Futures testnet. Default so an unconfigured run never touches real funds.
    #[default]
    Testnet,
}

impl BinanceEnvironment {
    /// REST API base URL.
    pub fn rest_base_url(&self) -> &'static str {
        match self {
            Self::Production => "https://fapi.binance.com",
            Self::Testnet => "https://testnet.binancefuture.com",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn is_testnet(&self) -> bool {
        matches!(self, Self::Testnet)
    }

    /// Load from `BINANCE_ENVIRONMENT`, falling back to the boolean `TESTNET` flag.
    ///
    /// Returns `Testnet` if neither is set or parseable.
    pub fn from_env() -> Self {
        Self::resolve(
            std::env::var("BINANCE_ENVIRONMENT").ok().as_deref(),
            std::env::var("TESTNET").ok().as_deref(),
        )
    }

    fn resolve(environment: Option<&str>, testnet_flag: Option<&str>) -> Self {
        if let Some(env) = environment.and_then(|s| s.parse().ok()) {
            return env;
        }
        match testnet_flag.map(|s| s.trim().to_lowercase()) {
            Some(flag) if matches!(flag.as_str(), "false" | "0" | "no") => Self::Production,
            _ => Self::Testnet,
        }
    }
}

impl fmt::Display for BinanceEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Production => write!(f, "production"),
            Self::Testnet => write!(f, "testnet"),
        }
    }
}

impl FromStr for BinanceEnvironment {
    type Err = ParseEnvironmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "production" | "prod" | "mainnet" | "live" => Ok(Self::Production),
            "testnet" | "test" | "sandbox" => Ok(Self::Testnet),
            _ => Err(ParseEnvironmentError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParseEnvironmentError(String);

impl fmt::Display for ParseEnvironmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid environment '{}', expected 'production' or 'testnet'",
            self.0
        )
    }
}

impl std::error::Error for ParseEnvironmentError {}
