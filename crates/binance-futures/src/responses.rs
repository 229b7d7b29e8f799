//! USDⓈ-M futures response payloads.

use crate::error::BinanceFuturesError;
use chrono::{DateTime, Utc};
use execution_core::{OrderOutcome, OrderStatus, Side, SymbolMetadata};
use rust_decimal::Decimal;
use serde::Deserialize;

/// GET /fapi/v1/time
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerTimeResponse {
    pub server_time: i64,
}

/// GET /fapi/v1/exchangeInfo (only the parts used here).
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeInfoResponse {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SymbolInfo {
    pub symbol: String,
    pub status: String,
    #[serde(default)]
    pub filters: Vec<SymbolFilter>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "filterType")]
pub enum SymbolFilter {
    #[serde(rename = "PRICE_FILTER", rename_all = "camelCase")]
    Price {
        #[serde(deserialize_with = "deserialize_decimal_from_str")]
        tick_size: Decimal,
    },
    #[serde(rename = "LOT_SIZE", rename_all = "camelCase")]
    LotSize {
        #[serde(deserialize_with = "deserialize_decimal_from_str")]
        min_qty: Decimal,
        #[serde(deserialize_with = "deserialize_decimal_from_str")]
        max_qty: Decimal,
        #[serde(deserialize_with = "deserialize_decimal_from_str")]
        step_size: Decimal,
    },
    #[serde(rename = "MIN_NOTIONAL")]
    MinNotional {
        #[serde(deserialize_with = "deserialize_decimal_from_str")]
        notional: Decimal,
    },
    #[serde(other)]
    Other,
}

impl SymbolInfo {
    /// Collapse the filter list into [`SymbolMetadata`].
    ///
    /// `LOT_SIZE` and `PRICE_FILTER` are mandatory; a missing `MIN_NOTIONAL` means no minimum.
    pub fn to_metadata(&self) -> Result<SymbolMetadata, BinanceFuturesError> {
        let mut lot = None;
        let mut tick_size = None;
        let mut min_notional = Decimal::ZERO;

        for filter in &self.filters {
            match filter {
                SymbolFilter::Price { tick_size: t } => tick_size = Some(*t),
                SymbolFilter::LotSize {
                    min_qty,
                    max_qty,
                    step_size,
                } => lot = Some((*min_qty, *max_qty, *step_size)),
                SymbolFilter::MinNotional { notional } => min_notional = *notional,
                SymbolFilter::Other => {}
            }
        }

        let (min_qty, max_qty, step_size) = lot.ok_or_else(|| {
            BinanceFuturesError::Parse(format!("{} has no LOT_SIZE filter", self.symbol))
        })?;
        let tick_size = tick_size.ok_or_else(|| {
            BinanceFuturesError::Parse(format!("{} has no PRICE_FILTER filter", self.symbol))
        })?;

        Ok(SymbolMetadata {
            symbol: self.symbol.clone(),
            step_size,
            min_qty,
            max_qty,
            tick_size,
            min_notional,
            trading_enabled: self.status == "TRADING",
        })
    }
}

/// GET /fapi/v1/ticker/price
#[derive(Debug, Clone, Deserialize)]
pub struct TickerPriceResponse {
    pub symbol: String,
    #[serde(deserialize_with = "deserialize_decimal_from_str")]
    pub price: Decimal,
}

/// One entry of GET /fapi/v2/balance.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceEntry {
    pub asset: String,
    #[serde(deserialize_with = "deserialize_decimal_from_str")]
    pub balance: Decimal,
    #[serde(deserialize_with = "deserialize_decimal_from_str")]
    pub available_balance: Decimal,
}

/// Order payload returned by POST, GET and DELETE /fapi/v1/order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub symbol: String,
    pub order_id: u64,
    pub client_order_id: String,
    pub status: String,
    pub side: String,
    #[serde(rename = "type")]
    pub order_type: String,
    #[serde(deserialize_with = "deserialize_decimal_from_str")]
    pub orig_qty: Decimal,
    #[serde(deserialize_with = "deserialize_decimal_from_str")]
    pub executed_qty: Decimal,
    #[serde(default, deserialize_with = "deserialize_decimal_from_str")]
    pub avg_price: Decimal,
    #[serde(default, deserialize_with = "deserialize_decimal_from_str")]
    pub cum_quote: Decimal,
    #[serde(default)]
    pub update_time: i64,
}

impl OrderResponse {
    pub fn to_outcome(&self) -> Result<OrderOutcome, BinanceFuturesError> {
        let status = OrderStatus::from_binance_str(&self.status).ok_or_else(|| {
            BinanceFuturesError::Parse(format!("unknown order status '{}'", self.status))
        })?;
        let side = Side::from_binance_str(&self.side)
            .ok_or_else(|| BinanceFuturesError::Parse(format!("unknown side '{}'", self.side)))?;

        let average_price = if self.executed_qty > Decimal::ZERO && self.avg_price > Decimal::ZERO
        {
            Some(self.avg_price)
        } else if self.executed_qty > Decimal::ZERO && self.cum_quote > Decimal::ZERO {
            Some(self.cum_quote / self.executed_qty)
        } else {
            None
        };

        let updated_at = DateTime::<Utc>::from_timestamp_millis(self.update_time)
            .filter(|_| self.update_time > 0)
            .unwrap_or_else(Utc::now);

        Ok(OrderOutcome {
            order_id: self.order_id,
            client_order_id: self.client_order_id.clone(),
            symbol: self.symbol.clone(),
            side,
            status,
            filled_quantity: self.executed_qty,
            average_price,
            updated_at,
        })
    }
}

/// Exchange numbers arrive as JSON strings.
fn deserialize_decimal_from_str<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    s.parse::<Decimal>().map_err(serde::de::Error::custom)
}
