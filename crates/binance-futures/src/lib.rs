//! Binance USDⓈ-M futures REST connector.
//!
//! - **Time synchronization**: signed requests use the measured server clock offset,
//!   re-measured after a `-1021` drift rejection
//! - **Order management**: place, query and cancel with HMAC signing
//! - **Gateway**: [`BinanceFuturesGateway`] implements `connector_core::ExchangeGateway`,
//!   classifying exchange error codes and retrying transient failures
//!
//! ```rust,ignore
//! let credentials = ApiCredentials::from_env()?;
//! let gateway = BinanceFuturesGateway::connect(credentials, &GatewayConfig::default()).await?;
//! let price = gateway.get_current_price("BTCUSDT").await?;
//! ```

mod client;
mod error;
mod gateway;
mod responses;

pub use client::BinanceFuturesClient;
pub use error::BinanceFuturesError;
pub use gateway::BinanceFuturesGateway;
pub use responses::{
    ExchangeInfoResponse, OrderResponse, ServerTimeResponse, SymbolFilter, SymbolInfo,
    TickerPriceResponse,
};
