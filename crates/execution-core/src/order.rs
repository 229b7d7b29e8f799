//! Order requests and the enums the futures API speaks.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn from_binance_str(s: &str) -> Option<Self> {
        match s {
            "BUY" => Some(Self::Buy),
            "SELL" => Some(Self::Sell),
            _ => None,
        }
    }

    pub fn as_binance_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_binance_str())
    }
}

/// Order kinds this bot submits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    Market,
    Limit,
    /// Stop-limit: rests untriggered until `stop_price` trades, then works as a limit at `price`.
    StopLimit,
}

impl OrderKind {
    pub fn from_binance_str(s: &str) -> Option<Self> {
        match s {
            "MARKET" => Some(Self::Market),
            "LIMIT" => Some(Self::Limit),
            "STOP" => Some(Self::StopLimit),
            _ => None,
        }
    }

    /// Futures calls a stop-limit plain `STOP`.
    pub fn as_binance_str(&self) -> &'static str {
        match self {
            Self::Market => "MARKET",
            Self::Limit => "LIMIT",
            Self::StopLimit => "STOP",
        }
    }

    pub fn requires_price(&self) -> bool {
        !matches!(self, Self::Market)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
    Expired,
}

impl OrderStatus {
    pub fn from_binance_str(s: &str) -> Option<Self> {
        match s {
            "NEW" => Some(Self::New),
            "PARTIALLY_FILLED" => Some(Self::PartiallyFilled),
            "FILLED" => Some(Self::Filled),
            "CANCELED" => Some(Self::Canceled),
            "REJECTED" => Some(Self::Rejected),
            "EXPIRED" | "EXPIRED_IN_MATCH" => Some(Self::Expired),
            _ => None,
        }
    }

    pub fn as_binance_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::PartiallyFilled => "PARTIALLY_FILLED",
            Self::Filled => "FILLED",
            Self::Canceled => "CANCELED",
            Self::Rejected => "REJECTED",
            Self::Expired => "EXPIRED",
        }
    }

    /// Order is done and will not change again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Filled | Self::Canceled | Self::Rejected | Self::Expired
        )
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::New | Self::PartiallyFilled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_binance_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good Till Canceled.
    #[default]
    GTC,
    /// Immediate Or Cancel.
    IOC,
    /// Fill Or Kill.
    FOK,
}

impl TimeInForce {
    pub fn from_binance_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GTC" => Some(Self::GTC),
            "IOC" => Some(Self::IOC),
            "FOK" => Some(Self::FOK),
            _ => None,
        }
    }

    pub fn as_binance_str(&self) -> &'static str {
        match self {
            Self::GTC => "GTC",
            Self::IOC => "IOC",
            Self::FOK => "FOK",
        }
    }
}

/// One order as the caller wants it placed.
///
/// Built per call and never mutated after validation; normalizing produces a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    pub kind: OrderKind,
    pub quantity: Decimal,
    /// Limit price; `None` for market orders.
    pub price: Option<Decimal>,
    /// Trigger price; only for `StopLimit`.
    pub stop_price: Option<Decimal>,
    pub time_in_force: Option<TimeInForce>,
}

impl OrderRequest {
    pub fn market(symbol: impl Into<String>, side: Side, quantity: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            kind: OrderKind::Market,
            quantity,
            price: None,
            stop_price: None,
            time_in_force: None,
        }
    }

    pub fn limit(
        symbol: impl Into<String>,
        side: Side,
        quantity: Decimal,
        price: Decimal,
        time_in_force: TimeInForce,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            kind: OrderKind::Limit,
            quantity,
            price: Some(price),
            stop_price: None,
            time_in_force: Some(time_in_force),
        }
    }

    pub fn stop_limit(
        symbol: impl Into<String>,
        side: Side,
        quantity: Decimal,
        stop_price: Decimal,
        limit_price: Decimal,
        time_in_force: TimeInForce,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            kind: OrderKind::StopLimit,
            quantity,
            price: Some(limit_price),
            stop_price: Some(stop_price),
            time_in_force: Some(time_in_force),
        }
    }

    /// Value at the order's own price, if it has one.
    pub fn notional(&self) -> Option<Decimal> {
        self.price.map(|p| p * self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_side_round_trip_and_opposite() {
        assert_eq!(Side::from_binance_str("BUY"), Some(Side::Buy));
        assert_eq!(Side::from_binance_str("buy"), None);
        assert_eq!(Side::Sell.as_binance_str(), "SELL");
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.to_string(), "SELL");
    }

    #[test]
    fn test_stop_limit_uses_futures_wire_name() {
        assert_eq!(OrderKind::StopLimit.as_binance_str(), "STOP");
        assert_eq!(OrderKind::from_binance_str("STOP"), Some(OrderKind::StopLimit));
        assert!(!OrderKind::Market.requires_price());
        assert!(OrderKind::StopLimit.requires_price());
    }

    #[test]
    fn test_status_classification() {
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Expired.is_terminal());
        assert!(!OrderStatus::PartiallyFilled.is_terminal());
        assert!(OrderStatus::New.is_active());
        assert_eq!(
            OrderStatus::from_binance_str("EXPIRED_IN_MATCH"),
            Some(OrderStatus::Expired)
        );
        assert_eq!(OrderStatus::from_binance_str("NEW_INSURANCE"), None);
    }

    #[test]
    fn test_time_in_force_parse_is_case_insensitive() {
        assert_eq!(TimeInForce::from_binance_str("ioc"), Some(TimeInForce::IOC));
        assert_eq!(TimeInForce::default(), TimeInForce::GTC);
        assert_eq!(TimeInForce::from_binance_str("GTX"), None);
    }

    #[test]
    fn test_request_constructors() {
        let market = OrderRequest::market("BTCUSDT", Side::Buy, dec!(0.01));
        assert_eq!(market.kind, OrderKind::Market);
        assert_eq!(market.notional(), None);

        let stop = OrderRequest::stop_limit(
            "BTCUSDT",
            Side::Sell,
            dec!(0.01),
            dec!(47000),
            dec!(46500),
            TimeInForce::GTC,
        );
        assert_eq!(stop.stop_price, Some(dec!(47000)));
        assert_eq!(stop.price, Some(dec!(46500)));
        assert_eq!(stop.notional(), Some(dec!(465.00)));
    }
}
