//! Thin `reqwest` wrapper shared by the exchange connectors.
//!
//! - JSON decoding into caller-supplied types
//! - Header injection for API keys
//! - HTTP status classification into [`RestError`], including rate limits
//!   and the `Retry-After` hint

mod client;
mod error;

pub use client::RestClient;
pub use error::RestError;
