//! In-memory gateway used by this crate's tests.

use async_trait::async_trait;
use connector_core::{ExchangeGateway, GatewayError};
use execution_core::{OrderOutcome, OrderRequest, SymbolMetadata};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Serves fixed BTCUSDT filters (HALTUSDT is listed but halted), counting fetches.
pub(crate) struct FilterGateway {
    pub(crate) fail_next: Mutex<Option<GatewayError>>,
    fetches: AtomicUsize,
}

impl FilterGateway {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            fetches: AtomicUsize::new(0),
            fail_next: Mutex::new(None),
        })
    }

    pub(crate) fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExchangeGateway for FilterGateway {
    async fn get_symbol_filters(&self, symbol: &str) -> Result<SymbolMetadata, GatewayError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        // Stay in flight long enough for concurrent callers to pile up.
        tokio::time::sleep(Duration::from_millis(20)).await;
        if let Some(err) = self.fail_next.lock().take() {
            return Err(err);
        }
        match symbol {
            "BTCUSDT" | "HALTUSDT" => Ok(SymbolMetadata {
                symbol: symbol.to_string(),
                step_size: dec!(0.001),
                min_qty: dec!(0.001),
                max_qty: dec!(1000),
                tick_size: dec!(0.1),
                min_notional: dec!(100),
                trading_enabled: symbol == "BTCUSDT",
            }),
            other => Err(GatewayError::UnknownSymbol(other.to_string())),
        }
    }

    async fn submit_order(&self, _: &OrderRequest) -> Result<OrderOutcome, GatewayError> {
        unreachable!("filter-only gateway")
    }

    async fn get_order_status(&self, _: &str, _: u64) -> Result<OrderOutcome, GatewayError> {
        unreachable!("filter-only gateway")
    }

    async fn cancel_order(&self, _: &str, _: u64) -> Result<(), GatewayError> {
        unreachable!("filter-only gateway")
    }

    async fn get_current_price(&self, _: &str) -> Result<Decimal, GatewayError> {
        unreachable!("filter-only gateway")
    }

    async fn get_available_balance(&self, _: &str) -> Result<Decimal, GatewayError> {
        unreachable!("filter-only gateway")
    }
}
