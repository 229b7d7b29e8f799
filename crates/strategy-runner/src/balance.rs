//! Quote balance checks ahead of BUY exposure.

use connector_core::ExchangeGateway;
use execution_core::Side;
use rust_decimal::Decimal;
use strategy_core::{StrategyError, ValidationError};

/// Quote asset every supported futures symbol margins in.
pub const BALANCE_ASSET: &str = "USDT";

/// Available quote balance, read through the gateway.
pub(crate) async fn available_balance(
    gateway: &dyn ExchangeGateway,
) -> Result<Decimal, StrategyError> {
    let available = gateway
        .get_available_balance(BALANCE_ASSET)
        .await
        .map_err(StrategyError::gateway("get_available_balance"))?;
    tracing::info!(asset = BALANCE_ASSET, available = %available, "Available balance");
    Ok(available)
}

/// Refuse a BUY whose estimated cost `quantity * price` exceeds the available balance.
///
/// SELL orders are not checked and cost no gateway call.
pub(crate) async fn ensure_buy_balance(
    gateway: &dyn ExchangeGateway,
    side: Side,
    quantity: Decimal,
    price: Decimal,
) -> Result<(), StrategyError> {
    if side != Side::Buy {
        return Ok(());
    }
    let required = quantity.saturating_mul(price);
    let available = available_balance(gateway).await?;
    if required > available {
        return Err(ValidationError::InsufficientBalance {
            asset: BALANCE_ASSET.to_string(),
            required: required.round_dp(2),
            available,
        }
        .into());
    }
    Ok(())
}
