use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Per-symbol trading constraints, as published by the exchange filters.
///
/// Immutable once fetched; a refresh produces a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolMetadata {
    pub symbol: String,
    /// Quantity increment (`LOT_SIZE.stepSize`).
    pub step_size: Decimal,
    pub min_qty: Decimal,
    pub max_qty: Decimal,
    /// Price increment (`PRICE_FILTER.tickSize`).
    pub tick_size: Decimal,
    /// Smallest accepted `quantity * price`. Zero when the symbol has no such filter.
    pub min_notional: Decimal,
    pub trading_enabled: bool,
}

/// Round `quantity` down to a multiple of `step`. Non-positive steps leave it unchanged.
///
/// `None` when the intermediate `quantity / step` leaves the decimal range.
pub fn floor_to_step(quantity: Decimal, step: Decimal) -> Option<Decimal> {
    if step <= Decimal::ZERO {
        return Some(quantity);
    }
    let units = quantity.checked_div(step)?.floor();
    Some(units.checked_mul(step)?.normalize())
}

/// Round `price` to the nearest multiple of `tick`, ties to even.
///
/// `None` when the intermediate `price / tick` leaves the decimal range.
pub fn round_to_tick(price: Decimal, tick: Decimal) -> Option<Decimal> {
    if tick <= Decimal::ZERO {
        return Some(price);
    }
    let units = price
        .checked_div(tick)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
    Some(units.checked_mul(tick)?.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_floor_never_rounds_up() {
        assert_eq!(floor_to_step(dec!(0.0157), dec!(0.001)), Some(dec!(0.015)));
        assert_eq!(floor_to_step(dec!(1.9999), dec!(1)), Some(dec!(1)));
        assert_eq!(floor_to_step(dec!(0.0009), dec!(0.001)), Some(dec!(0)));
    }

    #[test]
    fn test_floor_is_idempotent() {
        let once = floor_to_step(dec!(12.3456), dec!(0.01)).unwrap();
        assert_eq!(once, dec!(12.34));
        assert_eq!(floor_to_step(once, dec!(0.01)), Some(once));
    }

    #[test]
    fn test_tick_rounding_half_to_even() {
        // 100.05 / 0.1 = 1000.5 -> 1000
        assert_eq!(round_to_tick(dec!(100.05), dec!(0.1)), Some(dec!(100.0)));
        // 100.15 / 0.1 = 1001.5 -> 1002
        assert_eq!(round_to_tick(dec!(100.15), dec!(0.1)), Some(dec!(100.2)));
        assert_eq!(round_to_tick(dec!(100.17), dec!(0.1)), Some(dec!(100.2)));
        assert_eq!(round_to_tick(dec!(49000.123), dec!(0.1)), Some(dec!(49000.1)));
    }

    #[test]
    fn test_tick_rounding_is_idempotent() {
        let once = round_to_tick(dec!(123.456), dec!(0.05)).unwrap();
        assert_eq!(once, dec!(123.45));
        assert_eq!(round_to_tick(once, dec!(0.05)), Some(once));
    }

    #[test]
    fn test_zero_increment_is_identity() {
        assert_eq!(floor_to_step(dec!(1.23), Decimal::ZERO), Some(dec!(1.23)));
        assert_eq!(round_to_tick(dec!(1.23), Decimal::ZERO), Some(dec!(1.23)));
    }

    #[test]
    fn test_out_of_range_values_do_not_panic() {
        assert_eq!(round_to_tick(dec!(10000000000000000000000000000), dec!(0.1)), None);
        assert_eq!(floor_to_step(Decimal::MAX, dec!(0.001)), None);
    }
}
