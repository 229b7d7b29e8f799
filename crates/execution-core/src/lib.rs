//! Core order types shared by the gateway and the strategies.
//!
//! - **Orders**: `OrderRequest`, `Side`, `OrderKind`, `OrderStatus`, `TimeInForce`
//! - **Outcomes**: `OrderOutcome`, an immutable snapshot of one order as the exchange reports it
//! - **Symbols**: `SymbolMetadata` with the step/tick rounding every order passes through
//!
//! # Order Lifecycle
//!
//! 1. Caller builds an `OrderRequest` and validates it against `SymbolMetadata`
//! 2. Gateway assigns a `client_order_id` and submits it
//! 3. Each status poll yields a fresh `OrderOutcome`
//! 4. Order reaches a terminal state (Filled, Canceled, Rejected, Expired)

mod client_id;
mod order;
mod outcome;
mod symbol;

pub use client_id::generate_client_order_id;
pub use order::{OrderKind, OrderRequest, OrderStatus, Side, TimeInForce};
pub use outcome::OrderOutcome;
pub use symbol::{floor_to_step, round_to_tick, SymbolMetadata};
