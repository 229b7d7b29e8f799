//! The exchange contract the strategies are written against.
//!
//! Strategies never see HTTP, signing or retries. They receive a [`SharedGateway`]
//! in their constructor and only observe the closed [`GatewayError`] taxonomy.

mod error;
mod gateway;

pub use error::GatewayError;
pub use gateway::{ExchangeGateway, GatewayConfig, SharedGateway};
