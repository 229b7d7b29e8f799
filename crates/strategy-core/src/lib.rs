//! Validation building blocks shared by every order type.
//!
//! - **Metadata cache**: [`MetadataCache`] memoizes exchange symbol filters with a TTL
//!   and single-flight fetching
//! - **Validation**: pure per-axis checks plus the fail-fast [`validate_order`] pipeline
//! - **Clock**: injectable time source and cancellation checkpoints for strategy loops
//!
//! # Example
//!
//! ```rust,ignore
//! let cache = MetadataCache::new(gateway.clone(), Arc::new(TokioClock), DEFAULT_METADATA_TTL);
//! let metadata = validate_symbol(&cache, "BTCUSDT").await?;
//! let qty = validate_quantity(dec!(0.0157), &metadata)?; // 0.015
//! ```

mod clock;
mod error;
mod metadata;
mod validation;

#[cfg(test)]
mod test_support;

pub use clock::{
    is_cancelled, sleep_or_cancelled, CancelReceiver, Clock, ManualClock, SharedClock, TokioClock,
};
pub use error::{MetadataError, StrategyError, ValidationError};
pub use metadata::{MetadataCache, SharedMetadataCache, DEFAULT_METADATA_TTL};
pub use validation::{
    validate_notional, validate_order, validate_price, validate_price_relationship,
    validate_quantity, validate_side, validate_symbol, OrderDraft, ValidatedOrder,
};
