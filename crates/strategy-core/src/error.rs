use connector_core::GatewayError;
use execution_core::Side;
use rust_decimal::Decimal;
use thiserror::Error;

/// Local parameter failures. Always raised before any order reaches the exchange.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid symbol '{symbol}': {reason}")]
    Symbol { symbol: String, reason: String },

    #[error("invalid side '{input}', expected BUY or SELL")]
    Side { input: String },

    #[error("quantity {quantity} {reason} (min {min}, max {max}, step {step})")]
    QuantityRange {
        quantity: Decimal,
        min: Decimal,
        max: Decimal,
        step: Decimal,
        reason: String,
    },

    #[error("price {price} {reason} (tick {tick})")]
    PriceRange {
        price: Decimal,
        tick: Decimal,
        reason: String,
    },

    /// `notional` is `None` when `quantity * price` is not representable.
    #[error("notional {shown} ({quantity} x {price}) {reason}", shown = display_notional(.notional))]
    Notional {
        quantity: Decimal,
        price: Decimal,
        notional: Option<Decimal>,
        min_notional: Decimal,
        reason: String,
    },

    /// `violated` names the inequality that failed, with its values.
    #[error("invalid {side} stop-limit prices: requires {violated}")]
    PriceRelationship { side: Side, violated: String },

    #[error("invalid grid [{lower}, {upper}] with {levels} levels: {reason}")]
    GridRange {
        lower: Decimal,
        upper: Decimal,
        levels: usize,
        reason: String,
    },

    #[error("insufficient {asset} balance: requires ~{required}, available {available}")]
    InsufficientBalance {
        asset: String,
        required: Decimal,
        available: Decimal,
    },
}

fn display_notional(notional: &Option<Decimal>) -> String {
    match notional {
        Some(n) => n.to_string(),
        None => "overflow".to_string(),
    }
}

impl ValidationError {
    /// Pipeline stage that rejected the input.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Symbol { .. } => "symbol",
            Self::Side { .. } => "side",
            Self::QuantityRange { .. } => "quantity",
            Self::PriceRange { .. } => "price",
            Self::Notional { .. } => "notional",
            Self::PriceRelationship { .. } => "price_relationship",
            Self::GridRange { .. } => "grid_range",
            Self::InsufficientBalance { .. } => "balance",
        }
    }
}

/// Failures of [`crate::MetadataCache::get_metadata`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MetadataError {
    /// Not listed, or listed but not currently tradable.
    #[error("unknown symbol '{symbol}': {reason}")]
    UnknownSymbol { symbol: String, reason: String },

    #[error("symbol filter lookup failed: {0}")]
    Gateway(#[source] GatewayError),
}

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("validation failed at {stage}: {0}", stage = .0.stage())]
    Validation(#[from] ValidationError),

    /// `stage` is the gateway operation that failed.
    #[error("{stage} failed: {source}")]
    Gateway {
        stage: &'static str,
        #[source]
        source: GatewayError,
    },
}

impl StrategyError {
    pub fn gateway(stage: &'static str) -> impl FnOnce(GatewayError) -> Self {
        move |source| Self::Gateway { stage, source }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn gateway_error(&self) -> Option<&GatewayError> {
        match self {
            Self::Gateway { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

impl From<MetadataError> for StrategyError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::UnknownSymbol { symbol, reason } => {
                Self::Validation(ValidationError::Symbol { symbol, reason })
            }
            MetadataError::Gateway(source) => Self::Gateway {
                stage: "get_symbol_filters",
                source,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_messages_name_stage_and_value() {
        let err = StrategyError::from(ValidationError::Notional {
            quantity: dec!(0.001),
            price: dec!(50000),
            notional: Some(dec!(50)),
            min_notional: dec!(100),
            reason: "below minimum 100".into(),
        });
        assert_eq!(
            err.to_string(),
            "validation failed at notional: notional 50 (0.001 x 50000) below minimum 100"
        );
        assert!(err.is_validation());
    }

    #[test]
    fn test_unknown_symbol_becomes_symbol_validation_error() {
        let err = StrategyError::from(MetadataError::UnknownSymbol {
            symbol: "FOOUSDT".into(),
            reason: "not listed".into(),
        });
        assert!(matches!(
            err,
            StrategyError::Validation(ValidationError::Symbol { .. })
        ));
    }

    #[test]
    fn test_gateway_helper_records_stage() {
        let err = StrategyError::gateway("submit_order")(GatewayError::Auth("bad key".into()));
        assert_eq!(err.to_string(), "submit_order failed: authentication failed: bad key");
        assert!(err.gateway_error().is_some_and(GatewayError::is_fatal));
    }
}
