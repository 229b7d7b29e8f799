//! Order parameter checks against cached symbol constraints.
//!
//! Each check is total and pure except [`validate_symbol`], which reads the cache.
//! Composite validation runs symbol → side → quantity → price → notional and stops
//! at the first failure; nothing is submitted until every check has passed.

use crate::error::{StrategyError, ValidationError};
use crate::metadata::MetadataCache;
use execution_core::{
    floor_to_step, round_to_tick, OrderKind, OrderRequest, Side, SymbolMetadata, TimeInForce,
};
use rust_decimal::Decimal;

pub async fn validate_symbol(
    cache: &MetadataCache,
    symbol: &str,
) -> Result<SymbolMetadata, StrategyError> {
    let normalized = symbol.trim().to_ascii_uppercase();
    if normalized.is_empty() || !normalized.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::Symbol {
            symbol: symbol.to_string(),
            reason: "must be a non-empty alphanumeric ticker".into(),
        }
        .into());
    }
    Ok(cache.get_metadata(&normalized).await?)
}

/// Accepts "buy" or "sell" in any case.
pub fn validate_side(input: &str) -> Result<Side, ValidationError> {
    if input.eq_ignore_ascii_case("buy") {
        Ok(Side::Buy)
    } else if input.eq_ignore_ascii_case("sell") {
        Ok(Side::Sell)
    } else {
        Err(ValidationError::Side {
            input: input.to_string(),
        })
    }
}

/// Range-check, then round down to the step size. Never rounds up.
pub fn validate_quantity(
    quantity: Decimal,
    metadata: &SymbolMetadata,
) -> Result<Decimal, ValidationError> {
    let fail = |reason: String| ValidationError::QuantityRange {
        quantity,
        min: metadata.min_qty,
        max: metadata.max_qty,
        step: metadata.step_size,
        reason,
    };

    if quantity < metadata.min_qty {
        return Err(fail("is below the minimum".into()));
    }
    if quantity > metadata.max_qty {
        return Err(fail("is above the maximum".into()));
    }

    let rounded = floor_to_step(quantity, metadata.step_size)
        .ok_or_else(|| fail("cannot be rounded to the step size".into()))?;
    if rounded < metadata.min_qty || rounded <= Decimal::ZERO {
        return Err(fail(format!("rounds down to {} below the minimum", rounded)));
    }
    Ok(rounded)
}

/// Round half-to-even onto the tick grid; the result must stay positive.
pub fn validate_price(price: Decimal, metadata: &SymbolMetadata) -> Result<Decimal, ValidationError> {
    let fail = |reason: String| ValidationError::PriceRange {
        price,
        tick: metadata.tick_size,
        reason,
    };
    let rounded = round_to_tick(price, metadata.tick_size)
        .ok_or_else(|| fail("is out of range for tick rounding".into()))?;
    if rounded <= Decimal::ZERO {
        return Err(fail(format!("rounds to {}, must be positive", rounded)));
    }
    Ok(rounded)
}

pub fn validate_notional(
    quantity: Decimal,
    price: Decimal,
    metadata: &SymbolMetadata,
) -> Result<(), ValidationError> {
    let fail = |notional: Option<Decimal>, reason: String| ValidationError::Notional {
        quantity,
        price,
        notional,
        min_notional: metadata.min_notional,
        reason,
    };
    let notional = quantity
        .checked_mul(price)
        .ok_or_else(|| fail(None, "exceeds the representable range".into()))?;
    if notional < metadata.min_notional {
        return Err(fail(
            Some(notional),
            format!("below minimum {}", metadata.min_notional),
        ));
    }
    Ok(())
}

/// Stop-limit sanity against the market.
///
/// SELL: `stop < current` and `limit <= stop`. BUY: `stop > current` and `limit >= stop`.
pub fn validate_price_relationship(
    side: Side,
    stop_price: Decimal,
    limit_price: Decimal,
    current_price: Decimal,
) -> Result<(), ValidationError> {
    let violated = match side {
        Side::Sell if stop_price >= current_price => Some(format!(
            "stop_price ({}) < current_price ({})",
            stop_price, current_price
        )),
        Side::Sell if limit_price > stop_price => Some(format!(
            "limit_price ({}) <= stop_price ({})",
            limit_price, stop_price
        )),
        Side::Buy if stop_price <= current_price => Some(format!(
            "stop_price ({}) > current_price ({})",
            stop_price, current_price
        )),
        Side::Buy if limit_price < stop_price => Some(format!(
            "limit_price ({}) >= stop_price ({})",
            limit_price, stop_price
        )),
        _ => None,
    };

    match violated {
        Some(violated) => Err(ValidationError::PriceRelationship { side, violated }),
        None => Ok(()),
    }
}

/// Raw order parameters as received from a caller, before any normalization.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub symbol: String,
    pub side: String,
    pub kind: OrderKind,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub time_in_force: Option<TimeInForce>,
}

/// A draft that passed every check, with the constraints it was checked against.
#[derive(Debug, Clone)]
pub struct ValidatedOrder {
    pub request: OrderRequest,
    pub metadata: SymbolMetadata,
}

/// Full fail-fast pipeline for one order.
///
/// `market_price` supplies the notional reference for market orders and the
/// current price for the stop-limit relationship check.
pub async fn validate_order(
    cache: &MetadataCache,
    draft: &OrderDraft,
    market_price: Option<Decimal>,
) -> Result<ValidatedOrder, StrategyError> {
    let metadata = validate_symbol(cache, &draft.symbol).await?;
    let side = validate_side(&draft.side)?;
    let quantity = validate_quantity(draft.quantity, &metadata)?;

    let price = match (draft.kind.requires_price(), draft.price) {
        (true, Some(p)) => Some(validate_price(p, &metadata)?),
        (true, None) => {
            return Err(ValidationError::PriceRange {
                price: Decimal::ZERO,
                tick: metadata.tick_size,
                reason: format!("is required for {:?} orders", draft.kind),
            }
            .into())
        }
        (false, _) => None,
    };
    let stop_price = match (draft.kind, draft.stop_price) {
        (OrderKind::StopLimit, Some(p)) => Some(validate_price(p, &metadata)?),
        (OrderKind::StopLimit, None) => {
            return Err(ValidationError::PriceRange {
                price: Decimal::ZERO,
                tick: metadata.tick_size,
                reason: format!("is required for {:?} orders", draft.kind),
            }
            .into())
        }
        _ => None,
    };

    if let Some(reference) = price.or(market_price) {
        validate_notional(quantity, reference, &metadata)?;
    }

    if let (Some(stop), Some(limit), Some(current)) = (stop_price, price, market_price) {
        validate_price_relationship(side, stop, limit, current)?;
    }

    let request = OrderRequest {
        symbol: metadata.symbol.clone(),
        side,
        kind: draft.kind,
        quantity,
        price,
        stop_price,
        time_in_force: match draft.kind {
            OrderKind::Market => None,
            _ => Some(draft.time_in_force.unwrap_or_default()),
        },
    };

    tracing::debug!(
        symbol = %request.symbol,
        side = %request.side,
        quantity = %request.quantity,
        price = ?request.price,
        stop_price = ?request.stop_price,
        "Order validated"
    );
    Ok(ValidatedOrder { request, metadata })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::test_support::FilterGateway;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::time::Duration;

    fn cache() -> (Arc<FilterGateway>, MetadataCache) {
        let gateway = FilterGateway::new();
        let cache = MetadataCache::new(
            gateway.clone(),
            Arc::new(ManualClock::new()),
            Duration::from_secs(300),
        );
        (gateway, cache)
    }

    fn draft(side: &str, kind: OrderKind, qty: Decimal) -> OrderDraft {
        OrderDraft {
            symbol: "btcusdt".into(),
            side: side.into(),
            kind,
            quantity: qty,
            price: None,
            stop_price: None,
            time_in_force: None,
        }
    }

    fn btc() -> SymbolMetadata {
        SymbolMetadata {
            symbol: "BTCUSDT".into(),
            step_size: dec!(0.001),
            min_qty: dec!(0.001),
            max_qty: dec!(1000),
            tick_size: dec!(0.1),
            min_notional: dec!(100),
            trading_enabled: true,
        }
    }

    #[test]
    fn test_side_is_case_insensitive() {
        assert_eq!(validate_side("buy").unwrap(), Side::Buy);
        assert_eq!(validate_side("SeLL").unwrap(), Side::Sell);
        assert_eq!(
            validate_side("long").unwrap_err(),
            ValidationError::Side {
                input: "long".into()
            }
        );
        assert!(validate_side(" buy").is_err());
    }

    #[test]
    fn test_quantity_rounds_down_to_step() {
        assert_eq!(validate_quantity(dec!(0.0157), &btc()).unwrap(), dec!(0.015));
        assert_eq!(validate_quantity(dec!(0.015), &btc()).unwrap(), dec!(0.015));
    }

    #[test]
    fn test_quantity_never_increases() {
        for q in [dec!(0.001), dec!(0.0019), dec!(1.23456), dec!(999.9999)] {
            let rounded = validate_quantity(q, &btc()).unwrap();
            assert!(rounded <= q);
            assert_eq!(validate_quantity(rounded, &btc()).unwrap(), rounded);
        }
    }

    #[test]
    fn test_quantity_range_failures() {
        assert!(matches!(
            validate_quantity(dec!(0.0005), &btc()),
            Err(ValidationError::QuantityRange { .. })
        ));
        assert!(matches!(
            validate_quantity(dec!(1000.5), &btc()),
            Err(ValidationError::QuantityRange { .. })
        ));
    }

    #[test]
    fn test_quantity_rounding_below_minimum_fails() {
        let meta = SymbolMetadata {
            min_qty: dec!(0.0015),
            ..btc()
        };
        // 0.0019 passes the range check but floors to 0.001 < 0.0015
        let err = validate_quantity(dec!(0.0019), &meta).unwrap_err();
        assert!(err.to_string().contains("rounds down to 0.001"), "{}", err);
    }

    #[test]
    fn test_price_rounds_half_to_even() {
        assert_eq!(validate_price(dec!(50000.05), &btc()).unwrap(), dec!(50000.0));
        assert_eq!(validate_price(dec!(50000.15), &btc()).unwrap(), dec!(50000.2));
        assert_eq!(validate_price(dec!(49999.96), &btc()).unwrap(), dec!(50000));
    }

    #[test]
    fn test_price_rounding_to_zero_fails() {
        assert_eq!(
            validate_price(dec!(0.04), &btc()).unwrap_err(),
            ValidationError::PriceRange {
                price: dec!(0.04),
                tick: dec!(0.1),
                reason: "rounds to 0, must be positive".into()
            }
        );
        assert!(validate_price(dec!(-5), &btc()).is_err());
    }

    #[test]
    fn test_notional_minimum() {
        assert!(validate_notional(dec!(0.002), dec!(50000), &btc()).is_ok());
        assert!(validate_notional(dec!(0.001), dec!(100000), &btc()).is_ok());
        assert_eq!(
            validate_notional(dec!(0.001), dec!(50000), &btc()).unwrap_err(),
            ValidationError::Notional {
                quantity: dec!(0.001),
                price: dec!(50000),
                notional: Some(dec!(50)),
                min_notional: dec!(100),
                reason: "below minimum 100".into()
            }
        );
    }

    #[test]
    fn test_out_of_range_inputs_are_errors_not_panics() {
        let huge = dec!(10000000000000000000000000000);

        let err = validate_price(huge, &btc()).unwrap_err();
        assert!(matches!(err, ValidationError::PriceRange { .. }));
        assert!(err.to_string().contains("out of range"), "{}", err);

        let err = validate_notional(dec!(1000), huge, &btc()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::Notional { notional: None, .. }
        ));
        assert!(err.to_string().starts_with("notional overflow"), "{}", err);

        let tiny_step = SymbolMetadata {
            step_size: dec!(0.0000000000000000000000000001),
            min_qty: dec!(0.0000000000000000000000000001),
            max_qty: Decimal::MAX,
            ..btc()
        };
        assert!(matches!(
            validate_quantity(huge, &tiny_step),
            Err(ValidationError::QuantityRange { .. })
        ));
    }

    #[tokio::test]
    async fn test_huge_limit_price_rejected_before_gateway() {
        let (gateway, cache) = cache();
        let mut limit = draft("buy", OrderKind::Limit, dec!(1));
        limit.price = Some(dec!(10000000000000000000000000000));

        let err = validate_order(&cache, &limit, None).await.unwrap_err();
        assert!(matches!(
            err,
            StrategyError::Validation(ValidationError::PriceRange { .. })
        ));
        assert_eq!(gateway.fetches(), 1);
    }

    #[test]
    fn test_sell_stop_limit_above_stop_fails() {
        let err =
            validate_price_relationship(Side::Sell, dec!(47000), dec!(48000), dec!(50000))
                .unwrap_err();
        assert_eq!(
            err,
            ValidationError::PriceRelationship {
                side: Side::Sell,
                violated: "limit_price (48000) <= stop_price (47000)".into()
            }
        );
    }

    #[test]
    fn test_sell_stop_limit_valid() {
        assert!(
            validate_price_relationship(Side::Sell, dec!(47000), dec!(46500), dec!(50000))
                .is_ok()
        );
        assert!(
            validate_price_relationship(Side::Sell, dec!(47000), dec!(47000), dec!(50000))
                .is_ok()
        );
    }

    #[test]
    fn test_sell_stop_at_or_above_market_fails() {
        let err = validate_price_relationship(Side::Sell, dec!(50000), dec!(49000), dec!(50000))
            .unwrap_err();
        assert!(err.to_string().contains("stop_price (50000) < current_price (50000)"));
    }

    #[test]
    fn test_buy_relationship_mirrors_sell() {
        assert!(
            validate_price_relationship(Side::Buy, dec!(52000), dec!(52500), dec!(50000)).is_ok()
        );
        assert!(matches!(
            validate_price_relationship(Side::Buy, dec!(49000), dec!(49500), dec!(50000)),
            Err(ValidationError::PriceRelationship { side: Side::Buy, .. })
        ));
        let err = validate_price_relationship(Side::Buy, dec!(52000), dec!(51000), dec!(50000))
            .unwrap_err();
        assert!(err.to_string().contains("limit_price (51000) >= stop_price (52000)"));
    }

    #[tokio::test]
    async fn test_validate_order_normalizes_limit() {
        let (_, cache) = cache();
        let mut limit = draft("Buy", OrderKind::Limit, dec!(0.0157));
        limit.price = Some(dec!(49999.96));

        let validated = validate_order(&cache, &limit, None).await.unwrap();
        assert_eq!(validated.request.symbol, "BTCUSDT");
        assert_eq!(validated.request.side, Side::Buy);
        assert_eq!(validated.request.quantity, dec!(0.015));
        assert_eq!(validated.request.price, Some(dec!(50000)));
        assert_eq!(validated.request.time_in_force, Some(TimeInForce::GTC));
    }

    #[tokio::test]
    async fn test_validate_order_fails_fast_in_order() {
        let (_, cache) = cache();
        // Side and quantity are both bad; side is checked first.
        let bad = draft("hold", OrderKind::Market, dec!(0));
        let err = validate_order(&cache, &bad, Some(dec!(50000))).await.unwrap_err();
        assert!(matches!(
            err,
            StrategyError::Validation(ValidationError::Side { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_symbol_is_symbol_error() {
        let (_, cache) = cache();
        let mut unknown = draft("buy", OrderKind::Market, dec!(1));
        unknown.symbol = "FOOUSDT".into();

        let err = validate_order(&cache, &unknown, None).await.unwrap_err();
        assert!(matches!(
            err,
            StrategyError::Validation(ValidationError::Symbol { .. })
        ));
    }

    #[tokio::test]
    async fn test_malformed_symbol_skips_gateway() {
        let (gateway, cache) = cache();
        let err = validate_symbol(&cache, "BTC/USDT").await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(gateway.fetches(), 0);
    }

    #[tokio::test]
    async fn test_market_notional_uses_reference_price() {
        let (_, cache) = cache();
        let market = draft("sell", OrderKind::Market, dec!(0.001));

        let err = validate_order(&cache, &market, Some(dec!(50000)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StrategyError::Validation(ValidationError::Notional { .. })
        ));
    }

    #[tokio::test]
    async fn test_stop_limit_checks_relationship() {
        let (_, cache) = cache();
        let mut stop = draft("sell", OrderKind::StopLimit, dec!(0.01));
        stop.stop_price = Some(dec!(47000));
        stop.price = Some(dec!(48000));

        let err = validate_order(&cache, &stop, Some(dec!(50000)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StrategyError::Validation(ValidationError::PriceRelationship { .. })
        ));

        stop.price = Some(dec!(46500));
        let ok = validate_order(&cache, &stop, Some(dec!(50000))).await.unwrap();
        assert_eq!(ok.request.stop_price, Some(dec!(47000)));
        assert_eq!(ok.request.kind, OrderKind::StopLimit);
    }
}
