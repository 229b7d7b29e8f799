//! Order execution strategies built on the validation pipeline.
//!
//! - **TWAP**: [`TwapExecutor`] splits a quantity into equal market chunks at a fixed cadence
//! - **Grid**: [`GridTrader`] keeps a ladder of resting limits and books adjacent-level profit
//! - **Order entry**: [`OrderEntry`] for one-shot market, limit, stop-limit and OCO orders
//! - **OCO supervision**: [`OcoMonitor`] cancels the remaining leg once the other fills
//! - **Dry run**: [`DryRunGateway`] simulates writes against live prices
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────────┐     ┌────────────────┐
//! │ TwapExecutor │────>│ validate_order   │────>│ ExchangeGateway│
//! │ GridTrader   │     │ MetadataCache    │     │ (live/dry run) │
//! │ OrderEntry   │     └──────────────────┘     └────────────────┘
//! └──────────────┘              ^                        │
//!        ^                      └── symbol filters ──────┘
//!        └──────────── OrderOutcome / status polls ──────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! let executor = TwapExecutor::new(gateway, cache, Arc::new(TokioClock));
//! let report = executor.run(&params, cancel_rx).await?;
//! println!("VWAP: {:?}", report.stats.vwap);
//! ```

mod balance;
mod dry_run;
mod grid;
mod oco;
mod orders;
mod twap;

#[cfg(test)]
mod test_support;

pub use balance::BALANCE_ASSET;
pub use dry_run::DryRunGateway;
pub use grid::{
    compute_grid_levels, GridLevel, GridParams, GridPhase, GridReport, GridState, GridStatus,
    GridTrader, DEFAULT_GRID_LEVELS, DEFAULT_POLL_INTERVAL, STATUS_EVERY_TICKS,
};
pub use oco::{OcoLeg, OcoMonitor, OcoResolution, DEFAULT_OCO_POLL_INTERVAL};
pub use orders::{OcoOutcome, OrderEntry};
pub use twap::{
    ChunkRecord, ChunkResult, TwapExecutor, TwapParams, TwapPhase, TwapPlan, TwapReport,
    TwapSchedule, TwapStats,
};
