//! Single-shot order entry: one validation pass, then one gateway call per leg.

use crate::balance::ensure_buy_balance;
use connector_core::SharedGateway;
use execution_core::{OrderKind, OrderOutcome, Side, TimeInForce};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use strategy_core::{
    validate_order, validate_side, validate_symbol, OrderDraft, SharedMetadataCache, StrategyError,
    ValidatedOrder, ValidationError,
};

/// Limit prices further than this fraction from the market are logged as a warning.
const PRICE_DEVIATION_WARN: Decimal = dec!(0.05);

/// Both legs of a take-profit / stop-loss pair.
#[derive(Debug, Clone)]
pub struct OcoOutcome {
    pub take_profit: OrderOutcome,
    pub stop_loss: OrderOutcome,
}

pub struct OrderEntry {
    gateway: SharedGateway,
    cache: SharedMetadataCache,
}

impl OrderEntry {
    pub fn new(gateway: SharedGateway, cache: SharedMetadataCache) -> Self {
        Self { gateway, cache }
    }

    pub async fn place_market_order(
        &self,
        symbol: &str,
        side: &str,
        quantity: Decimal,
    ) -> Result<OrderOutcome, StrategyError> {
        let (symbol, current) = self.symbol_and_price(symbol, side).await?;
        let order = self
            .validate(
                draft(&symbol, side, OrderKind::Market, quantity, None, None, None),
                current,
            )
            .await?;
        self.submit(&order, "submit_order").await
    }

    pub async fn place_limit_order(
        &self,
        symbol: &str,
        side: &str,
        quantity: Decimal,
        price: Decimal,
        time_in_force: TimeInForce,
    ) -> Result<OrderOutcome, StrategyError> {
        let (symbol, current) = self.symbol_and_price(symbol, side).await?;
        let order = self
            .validate(
                draft(
                    &symbol,
                    side,
                    OrderKind::Limit,
                    quantity,
                    Some(price),
                    None,
                    Some(time_in_force),
                ),
                current,
            )
            .await?;

        if let Some(limit) = order.request.price {
            warn_if_far_from_market(&symbol, limit, current);
        }
        self.check_balance(&order).await?;
        self.submit(&order, "submit_order").await
    }

    pub async fn place_stop_limit_order(
        &self,
        symbol: &str,
        side: &str,
        quantity: Decimal,
        stop_price: Decimal,
        limit_price: Decimal,
        time_in_force: TimeInForce,
    ) -> Result<OrderOutcome, StrategyError> {
        let (symbol, current) = self.symbol_and_price(symbol, side).await?;
        let order = self
            .validate(
                draft(
                    &symbol,
                    side,
                    OrderKind::StopLimit,
                    quantity,
                    Some(limit_price),
                    Some(stop_price),
                    Some(time_in_force),
                ),
                current,
            )
            .await?;
        self.check_balance(&order).await?;
        self.submit(&order, "submit_order").await
    }

    /// Take-profit limit plus protective stop-limit on the same side.
    ///
    /// Both legs are validated before either is placed. If the stop-loss leg fails
    /// the take-profit is cancelled so no unprotected order is left behind.
    pub async fn place_oco_order(
        &self,
        symbol: &str,
        side: &str,
        quantity: Decimal,
        take_profit: Decimal,
        stop_price: Decimal,
        stop_limit_price: Decimal,
    ) -> Result<OcoOutcome, StrategyError> {
        let (symbol, current) = self.symbol_and_price(symbol, side).await?;
        let tp = self
            .validate(
                draft(
                    &symbol,
                    side,
                    OrderKind::Limit,
                    quantity,
                    Some(take_profit),
                    None,
                    Some(TimeInForce::GTC),
                ),
                current,
            )
            .await?;
        let sl = self
            .validate(
                draft(
                    &symbol,
                    side,
                    OrderKind::StopLimit,
                    quantity,
                    Some(stop_limit_price),
                    Some(stop_price),
                    Some(TimeInForce::GTC),
                ),
                current,
            )
            .await?;

        if let (Some(tp_price), Some(stop)) = (tp.request.price, sl.request.stop_price) {
            let violated = match tp.request.side {
                Side::Sell if tp_price <= stop => Some(format!(
                    "take_profit ({}) > stop_price ({})",
                    tp_price, stop
                )),
                Side::Buy if tp_price >= stop => Some(format!(
                    "take_profit ({}) < stop_price ({})",
                    tp_price, stop
                )),
                _ => None,
            };
            if let Some(violated) = violated {
                return Err(ValidationError::PriceRelationship {
                    side: tp.request.side,
                    violated,
                }
                .into());
            }
        }

        let take_profit = self.submit(&tp, "submit_take_profit").await?;
        match self.submit(&sl, "submit_stop_loss").await {
            Ok(stop_loss) => Ok(OcoOutcome {
                take_profit,
                stop_loss,
            }),
            Err(e) => {
                tracing::warn!(
                    order_id = take_profit.order_id,
                    "Stop-loss leg failed, cancelling take-profit"
                );
                if let Err(cancel_err) = self
                    .gateway
                    .cancel_order(&take_profit.symbol, take_profit.order_id)
                    .await
                {
                    tracing::error!(
                        order_id = take_profit.order_id,
                        error = %cancel_err,
                        "Failed to cancel take-profit leg"
                    );
                }
                Err(e)
            }
        }
    }

    /// Normalized symbol and its current price.
    ///
    /// Unknown symbols and unparseable sides fail before the price call.
    async fn symbol_and_price(
        &self,
        symbol: &str,
        side: &str,
    ) -> Result<(String, Decimal), StrategyError> {
        let metadata = validate_symbol(&self.cache, symbol).await?;
        validate_side(side)?;
        let price = self
            .gateway
            .get_current_price(&metadata.symbol)
            .await
            .map_err(StrategyError::gateway("get_current_price"))?;
        Ok((metadata.symbol, price))
    }

    /// BUY limit-priced orders must be covered by the quote balance at their limit price.
    async fn check_balance(&self, order: &ValidatedOrder) -> Result<(), StrategyError> {
        let request = &order.request;
        match request.price {
            Some(price) => {
                ensure_buy_balance(self.gateway.as_ref(), request.side, request.quantity, price)
                    .await
            }
            None => Ok(()),
        }
    }

    async fn validate(
        &self,
        draft: OrderDraft,
        current: Decimal,
    ) -> Result<ValidatedOrder, StrategyError> {
        validate_order(&self.cache, &draft, Some(current)).await
    }

    async fn submit(
        &self,
        order: &ValidatedOrder,
        stage: &'static str,
    ) -> Result<OrderOutcome, StrategyError> {
        let request = &order.request;
        tracing::info!(
            stage,
            symbol = %request.symbol,
            side = %request.side,
            kind = ?request.kind,
            quantity = %request.quantity,
            price = ?request.price,
            stop_price = ?request.stop_price,
            "Submitting order"
        );
        match self.gateway.submit_order(request).await {
            Ok(outcome) => {
                tracing::info!(
                    stage,
                    order_id = outcome.order_id,
                    client_order_id = %outcome.client_order_id,
                    status = %outcome.status,
                    "Order accepted"
                );
                Ok(outcome)
            }
            Err(e) => {
                tracing::error!(stage, kind = e.kind(), error = %e, "Order submission failed");
                Err(StrategyError::gateway(stage)(e))
            }
        }
    }
}

fn warn_if_far_from_market(symbol: &str, limit: Decimal, current: Decimal) {
    let deviation = (limit - current)
        .abs()
        .checked_div(current)
        .filter(|d| *d > PRICE_DEVIATION_WARN);
    if let Some(deviation) = deviation {
        tracing::warn!(
            symbol = %symbol,
            price = %limit,
            current_price = %current,
            deviation_pct = %deviation.saturating_mul(Decimal::ONE_HUNDRED).round_dp(2),
            "Limit price far from market"
        );
    }
}

fn draft(
    symbol: &str,
    side: &str,
    kind: OrderKind,
    quantity: Decimal,
    price: Option<Decimal>,
    stop_price: Option<Decimal>,
    time_in_force: Option<TimeInForce>,
) -> OrderDraft {
    OrderDraft {
        symbol: symbol.to_string(),
        side: side.to_string(),
        kind,
        quantity,
        price,
        stop_price,
        time_in_force,
    }
}
