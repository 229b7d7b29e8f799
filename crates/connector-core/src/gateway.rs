use crate::error::GatewayError;
use async_trait::async_trait;
use common::{BinanceEnvironment, RetryPolicy};
use execution_core::{OrderOutcome, OrderRequest, SymbolMetadata};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

/// Narrow exchange surface consumed by validation and the strategies.
///
/// Implementations own authentication, transport and retry of transient failures.
/// Futures addresses an order by `(symbol, order_id)`, so status and cancel take both.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Trading constraints for `symbol`. `UnknownSymbol` if the exchange does not list it.
    async fn get_symbol_filters(&self, symbol: &str) -> Result<SymbolMetadata, GatewayError>;

    async fn submit_order(&self, request: &OrderRequest) -> Result<OrderOutcome, GatewayError>;

    async fn get_order_status(
        &self,
        symbol: &str,
        order_id: u64,
    ) -> Result<OrderOutcome, GatewayError>;

    /// `AlreadyClosed` when the order had already reached a terminal state.
    async fn cancel_order(&self, symbol: &str, order_id: u64) -> Result<(), GatewayError>;

    async fn get_current_price(&self, symbol: &str) -> Result<Decimal, GatewayError>;

    /// Wallet balance of `asset` free for new positions. Zero when the account holds none.
    async fn get_available_balance(&self, asset: &str) -> Result<Decimal, GatewayError>;

    /// True for gateways that never reach the exchange's matching engine.
    fn is_simulated(&self) -> bool {
        false
    }
}

pub type SharedGateway = Arc<dyn ExchangeGateway>;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub environment: BinanceEnvironment,
    /// Validity window for signed requests.
    pub recv_window_ms: u64,
    pub request_timeout: Duration,
    /// Applied to every call; only `Network` and `RateLimit` are retried.
    pub retry: RetryPolicy,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            environment: BinanceEnvironment::default(),
            recv_window_ms: 5_000,
            request_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }
}
