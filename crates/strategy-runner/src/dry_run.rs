//! Simulated gateway for dry-run mode.
//!
//! Reads (symbol filters, prices) go to the wrapped gateway; writes never leave the
//! process. Market orders fill at the current price on submit. Resting orders are
//! evaluated against the current price whenever their status is queried.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use connector_core::{ExchangeGateway, GatewayError, SharedGateway};
use execution_core::{
    generate_client_order_id, OrderKind, OrderOutcome, OrderRequest, OrderStatus, Side,
    SymbolMetadata,
};

/// Counter for generating unique simulated order IDs.
static SIMULATED_ORDER_ID: AtomicU64 = AtomicU64::new(1_000_000);

struct SimulatedOrder {
    request: OrderRequest,
    outcome: OrderOutcome,
    /// Stop orders behave as limits once their trigger is crossed.
    triggered: bool,
}

pub struct DryRunGateway {
    inner: SharedGateway,
    orders: Mutex<HashMap<u64, SimulatedOrder>>,
}

impl DryRunGateway {
    pub fn new(inner: SharedGateway) -> Self {
        Self {
            inner,
            orders: Mutex::new(HashMap::new()),
        }
    }
}

/// Whether a limit at `limit` trades against a market at `price`.
fn crosses(side: Side, limit: Decimal, price: Decimal) -> bool {
    match side {
        Side::Buy => price <= limit,
        Side::Sell => price >= limit,
    }
}

/// Buy stops trigger on a rise through the stop, sell stops on a fall.
fn stop_triggered(side: Side, stop: Decimal, price: Decimal) -> bool {
    match side {
        Side::Buy => price >= stop,
        Side::Sell => price <= stop,
    }
}

impl SimulatedOrder {
    /// Advance the order against `price`. Returns `true` if it filled.
    fn evaluate(&mut self, price: Decimal) -> bool {
        if !self.outcome.status.is_active() {
            return false;
        }
        if self.request.kind == OrderKind::StopLimit && !self.triggered {
            match self.request.stop_price {
                Some(stop) if stop_triggered(self.request.side, stop, price) => {
                    self.triggered = true
                }
                _ => return false,
            }
        }
        let limit = match self.request.price {
            Some(limit) => limit,
            None => price,
        };
        if !crosses(self.request.side, limit, price) {
            return false;
        }

        self.outcome.status = OrderStatus::Filled;
        self.outcome.filled_quantity = self.request.quantity;
        self.outcome.average_price = Some(limit);
        self.outcome.updated_at = Utc::now();
        true
    }
}

#[async_trait]
impl ExchangeGateway for DryRunGateway {
    async fn get_symbol_filters(&self, symbol: &str) -> Result<SymbolMetadata, GatewayError> {
        self.inner.get_symbol_filters(symbol).await
    }

    async fn submit_order(&self, request: &OrderRequest) -> Result<OrderOutcome, GatewayError> {
        let price = self.inner.get_current_price(&request.symbol).await?;
        let order_id = SIMULATED_ORDER_ID.fetch_add(1, Ordering::Relaxed);

        let mut order = SimulatedOrder {
            request: request.clone(),
            outcome: OrderOutcome {
                order_id,
                client_order_id: generate_client_order_id("dry"),
                symbol: request.symbol.clone(),
                side: request.side,
                status: OrderStatus::New,
                filled_quantity: Decimal::ZERO,
                average_price: None,
                updated_at: Utc::now(),
            },
            triggered: false,
        };
        // Only market orders fill on submit; resting orders wait for a status query.
        if request.kind == OrderKind::Market {
            order.evaluate(price);
        }

        tracing::info!(
            order_id,
            symbol = %request.symbol,
            side = %request.side,
            kind = ?request.kind,
            quantity = %request.quantity,
            price = ?request.price,
            status = %order.outcome.status,
            "[DRY RUN] Simulated order"
        );

        let outcome = order.outcome.clone();
        self.orders.lock().insert(order_id, order);
        Ok(outcome)
    }

    async fn get_order_status(
        &self,
        symbol: &str,
        order_id: u64,
    ) -> Result<OrderOutcome, GatewayError> {
        let price = self.inner.get_current_price(symbol).await?;
        let mut orders = self.orders.lock();
        let order = orders.get_mut(&order_id).ok_or(GatewayError::Rejection {
            code: -2013,
            message: "Order does not exist.".into(),
        })?;
        if order.evaluate(price) {
            tracing::info!(order_id, price = ?order.outcome.average_price, "[DRY RUN] Simulated fill");
        }
        Ok(order.outcome.clone())
    }

    async fn cancel_order(&self, _symbol: &str, order_id: u64) -> Result<(), GatewayError> {
        let mut orders = self.orders.lock();
        match orders.get_mut(&order_id) {
            Some(order) if order.outcome.status.is_active() => {
                order.outcome.status = OrderStatus::Canceled;
                order.outcome.updated_at = Utc::now();
                tracing::info!(order_id, "[DRY RUN] Simulated cancel");
                Ok(())
            }
            _ => Err(GatewayError::AlreadyClosed { order_id }),
        }
    }

    async fn get_current_price(&self, symbol: &str) -> Result<Decimal, GatewayError> {
        self.inner.get_current_price(symbol).await
    }

    /// Dry runs usually carry no credentials; an unreadable balance never blocks a simulation.
    async fn get_available_balance(&self, asset: &str) -> Result<Decimal, GatewayError> {
        match self.inner.get_available_balance(asset).await {
            Ok(balance) => Ok(balance),
            Err(e) => {
                tracing::warn!(asset, error = %e, "[DRY RUN] Balance unavailable, treating as unlimited");
                Ok(Decimal::MAX)
            }
        }
    }

    fn is_simulated(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockGateway;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn dry_run() -> (Arc<MockGateway>, DryRunGateway) {
        let market = MockGateway::new(dec!(50000));
        (market.clone(), DryRunGateway::new(market))
    }

    #[tokio::test]
    async fn test_market_order_fills_at_current_price() {
        let (market, gateway) = dry_run();

        let outcome = gateway
            .submit_order(&OrderRequest::market("BTCUSDT", Side::Buy, dec!(0.1)))
            .await
            .unwrap();

        assert_eq!(outcome.status, OrderStatus::Filled);
        assert_eq!(outcome.filled_quantity, dec!(0.1));
        assert_eq!(outcome.average_price, Some(dec!(50000)));
        assert!(outcome.client_order_id.starts_with("dry_"));
        assert!(market.submissions().is_empty());
        assert!(gateway.is_simulated());
    }

    #[tokio::test]
    async fn test_limit_rests_until_price_crosses() {
        let (market, gateway) = dry_run();
        let request =
            OrderRequest::limit("BTCUSDT", Side::Buy, dec!(0.1), dec!(49000), Default::default());

        let placed = gateway.submit_order(&request).await.unwrap();
        assert_eq!(placed.status, OrderStatus::New);

        let status = gateway.get_order_status("BTCUSDT", placed.order_id).await.unwrap();
        assert_eq!(status.status, OrderStatus::New);

        market.set_price(dec!(48950));
        let status = gateway.get_order_status("BTCUSDT", placed.order_id).await.unwrap();
        assert_eq!(status.status, OrderStatus::Filled);
        assert_eq!(status.average_price, Some(dec!(49000)));
    }

    #[tokio::test]
    async fn test_stop_limit_needs_trigger_then_limit() {
        let (market, gateway) = dry_run();
        let request = OrderRequest::stop_limit(
            "BTCUSDT",
            Side::Sell,
            dec!(0.1),
            dec!(48000),
            dec!(47900),
            Default::default(),
        );
        let placed = gateway.submit_order(&request).await.unwrap();

        market.set_price(dec!(48500));
        let status = gateway.get_order_status("BTCUSDT", placed.order_id).await.unwrap();
        assert_eq!(status.status, OrderStatus::New);

        market.set_price(dec!(47950));
        let status = gateway.get_order_status("BTCUSDT", placed.order_id).await.unwrap();
        assert_eq!(status.status, OrderStatus::Filled);
        assert_eq!(status.average_price, Some(dec!(47900)));
    }

    #[tokio::test]
    async fn test_cancel_closed_or_unknown_order() {
        let (_, gateway) = dry_run();
        let request =
            OrderRequest::limit("BTCUSDT", Side::Sell, dec!(0.1), dec!(51000), Default::default());
        let placed = gateway.submit_order(&request).await.unwrap();

        gateway.cancel_order("BTCUSDT", placed.order_id).await.unwrap();
        let status = gateway.get_order_status("BTCUSDT", placed.order_id).await.unwrap();
        assert_eq!(status.status, OrderStatus::Canceled);

        assert_eq!(
            gateway.cancel_order("BTCUSDT", placed.order_id).await,
            Err(GatewayError::AlreadyClosed {
                order_id: placed.order_id
            })
        );
        assert!(matches!(
            gateway.cancel_order("BTCUSDT", 42).await,
            Err(GatewayError::AlreadyClosed { order_id: 42 })
        ));
    }

    #[tokio::test]
    async fn test_unreadable_balance_is_unlimited() {
        let (market, gateway) = dry_run();
        market.set_balance(dec!(250));
        assert_eq!(gateway.get_available_balance("USDT").await, Ok(dec!(250)));

        market.fail_balance(GatewayError::Auth("API-key format invalid.".into()));
        assert_eq!(gateway.get_available_balance("USDT").await, Ok(Decimal::MAX));
    }
}
