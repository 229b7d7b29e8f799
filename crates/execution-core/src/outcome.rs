use crate::order::{OrderStatus, Side};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Snapshot of one order as last reported by the exchange. A fresh one is fetched per poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderOutcome {
    /// Exchange-assigned identifier.
    pub order_id: u64,
    pub client_order_id: String,
    pub symbol: String,
    pub side: Side,
    pub status: OrderStatus,
    pub filled_quantity: Decimal,
    /// `None` until something has filled.
    pub average_price: Option<Decimal>,
    pub updated_at: DateTime<Utc>,
}

impl OrderOutcome {
    pub fn is_filled(&self) -> bool {
        self.status == OrderStatus::Filled
    }

    /// Quote value of the fills so far.
    pub fn filled_notional(&self) -> Decimal {
        self.average_price
            .map(|p| p * self.filled_quantity)
            .unwrap_or(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn outcome(status: OrderStatus, qty: Decimal, price: Option<Decimal>) -> OrderOutcome {
        OrderOutcome {
            order_id: 1,
            client_order_id: "test_1".into(),
            symbol: "BTCUSDT".into(),
            side: Side::Buy,
            status,
            filled_quantity: qty,
            average_price: price,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_filled_notional() {
        let filled = outcome(OrderStatus::Filled, dec!(0.4), Some(dec!(100)));
        assert!(filled.is_filled());
        assert_eq!(filled.filled_notional(), dec!(40));

        let resting = outcome(OrderStatus::New, Decimal::ZERO, None);
        assert!(!resting.is_filled());
        assert_eq!(resting.filled_notional(), Decimal::ZERO);
    }
}
