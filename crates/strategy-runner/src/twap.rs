//! Time-weighted order splitting.
//!
//! A run moves `Planning → Running → {Completed | Cancelled | Aborted}`. Chunks are
//! submitted strictly one after another as market orders; chunk starts are spaced by
//! a constant interval regardless of how long each submission took.

use crate::balance::ensure_buy_balance;
use chrono::{DateTime, Utc};
use connector_core::{GatewayError, SharedGateway};
use execution_core::{floor_to_step, OrderOutcome, OrderRequest, Side, SymbolMetadata};
use rust_decimal::Decimal;
use std::time::Duration;
use strategy_core::{
    is_cancelled, sleep_or_cancelled, validate_notional, validate_quantity, validate_side,
    validate_symbol, CancelReceiver, SharedClock, SharedMetadataCache, StrategyError,
    ValidationError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwapPhase {
    Planning,
    Running,
    Completed,
    Cancelled,
    /// Stopped early by a fatal gateway error (credentials rejected).
    Aborted,
}

impl TwapPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Aborted)
    }
}

/// Spacing between chunk starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwapSchedule {
    Interval(Duration),
    /// Whole-run duration, divided evenly by the chunk count.
    Duration(Duration),
}

#[derive(Debug, Clone)]
pub struct TwapParams {
    pub symbol: String,
    pub side: String,
    pub total_quantity: Decimal,
    pub chunks: u32,
    pub schedule: TwapSchedule,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwapPlan {
    pub symbol: String,
    pub side: Side,
    /// Total after rounding down to the step size.
    pub total_quantity: Decimal,
    pub chunk_count: u32,
    pub interval: Duration,
    pub chunk_quantity: Decimal,
    /// Base chunk plus the rounding remainder, so nothing is left over.
    pub last_chunk_quantity: Decimal,
}

impl TwapPlan {
    /// Split `total` into `chunks` step-aligned slices and check each against the symbol limits.
    ///
    /// `reference_price` is the current market price used for the notional check.
    pub fn build(
        symbol: &SymbolMetadata,
        side: Side,
        total: Decimal,
        chunks: u32,
        schedule: TwapSchedule,
        reference_price: Decimal,
    ) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::QuantityRange {
            quantity: total,
            min: symbol.min_qty,
            max: symbol.max_qty,
            step: symbol.step_size,
            reason: reason.to_string(),
        };
        if chunks == 0 {
            return Err(invalid("cannot be split into 0 chunks"));
        }

        let total_quantity = floor_to_step(total, symbol.step_size)
            .ok_or_else(|| invalid("cannot be rounded to the step size"))?;
        let base = floor_to_step(total_quantity / Decimal::from(chunks), symbol.step_size)
            .ok_or_else(|| invalid("cannot be rounded to the step size"))?;
        let last = total_quantity - base * Decimal::from(chunks - 1);

        let chunk_quantity = validate_quantity(base, symbol).map_err(|e| per_chunk(e, chunks))?;
        let last_chunk_quantity =
            validate_quantity(last, symbol).map_err(|e| per_chunk(e, chunks))?;
        validate_notional(chunk_quantity, reference_price, symbol)?;

        let interval = match schedule {
            TwapSchedule::Interval(d) => d,
            TwapSchedule::Duration(d) => d / chunks,
        };

        Ok(Self {
            symbol: symbol.symbol.clone(),
            side,
            total_quantity,
            chunk_count: chunks,
            interval,
            chunk_quantity,
            last_chunk_quantity,
        })
    }

    /// Quantity for the zero-based chunk `index`.
    pub fn quantity_for(&self, index: u32) -> Decimal {
        if index + 1 == self.chunk_count {
            self.last_chunk_quantity
        } else {
            self.chunk_quantity
        }
    }
}

fn per_chunk(err: ValidationError, chunks: u32) -> ValidationError {
    match err {
        ValidationError::QuantityRange {
            quantity,
            min,
            max,
            step,
            reason,
        } => ValidationError::QuantityRange {
            quantity,
            min,
            max,
            step,
            reason: format!("per chunk ({} chunks) {}", chunks, reason),
        },
        other => other,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChunkResult {
    Executed(OrderOutcome),
    Failed(GatewayError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    pub index: u32,
    pub requested_quantity: Decimal,
    pub result: ChunkResult,
    pub timestamp: DateTime<Utc>,
    /// Chunk start relative to the start of the run.
    pub offset: Duration,
}

impl ChunkRecord {
    /// `(quantity, price)` when the chunk actually traded.
    fn fill(&self) -> Option<(Decimal, Decimal)> {
        match &self.result {
            ChunkResult::Executed(outcome) if outcome.filled_quantity > Decimal::ZERO => outcome
                .average_price
                .map(|price| (outcome.filled_quantity, price)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TwapStats {
    pub total_filled: Decimal,
    /// Volume-weighted average fill price. `None` when nothing filled.
    pub vwap: Option<Decimal>,
    /// Sum of `quantity * price` over fills: cost for BUY, proceeds for SELL.
    pub quote_value: Decimal,
    pub succeeded: u32,
    pub failed: u32,
}

impl TwapStats {
    pub fn from_records(records: &[ChunkRecord]) -> Self {
        let mut stats = Self::default();
        for record in records {
            match record.fill() {
                Some((qty, price)) => {
                    stats.succeeded += 1;
                    stats.total_filled += qty;
                    stats.quote_value += qty * price;
                }
                None => stats.failed += 1,
            }
        }
        if stats.total_filled > Decimal::ZERO {
            stats.vwap = Some(stats.quote_value / stats.total_filled);
        }
        stats
    }
}

#[derive(Debug, Clone)]
pub struct TwapReport {
    pub plan: TwapPlan,
    pub phase: TwapPhase,
    pub records: Vec<ChunkRecord>,
    pub stats: TwapStats,
    pub aborted_by: Option<GatewayError>,
    pub elapsed: Duration,
}

pub struct TwapExecutor {
    gateway: SharedGateway,
    cache: SharedMetadataCache,
    clock: SharedClock,
}

impl TwapExecutor {
    pub fn new(gateway: SharedGateway, cache: SharedMetadataCache, clock: SharedClock) -> Self {
        Self {
            gateway,
            cache,
            clock,
        }
    }

    /// Validate the parameters and build the plan. Places no orders.
    pub async fn plan(&self, params: &TwapParams) -> Result<TwapPlan, StrategyError> {
        let metadata = validate_symbol(&self.cache, &params.symbol).await?;
        let side = validate_side(&params.side)?;
        let price = self
            .gateway
            .get_current_price(&metadata.symbol)
            .await
            .map_err(StrategyError::gateway("get_current_price"))?;

        let plan = TwapPlan::build(
            &metadata,
            side,
            params.total_quantity,
            params.chunks,
            params.schedule,
            price,
        )?;
        ensure_buy_balance(self.gateway.as_ref(), plan.side, plan.total_quantity, price).await?;

        tracing::info!(
            symbol = %plan.symbol,
            side = %plan.side,
            total = %plan.total_quantity,
            chunks = plan.chunk_count,
            chunk_quantity = %plan.chunk_quantity,
            last_chunk_quantity = %plan.last_chunk_quantity,
            interval_secs = plan.interval.as_secs_f64(),
            "TWAP planned"
        );
        Ok(plan)
    }

    /// Plan, then execute to a terminal phase.
    pub async fn run(
        &self,
        params: &TwapParams,
        cancel: CancelReceiver,
    ) -> Result<TwapReport, StrategyError> {
        let plan = self.plan(params).await?;
        Ok(self.execute(plan, cancel).await)
    }

    /// Drive the chunk loop. Chunk failures are recorded and skipped; only a fatal
    /// gateway error stops the loop early.
    pub async fn execute(&self, plan: TwapPlan, mut cancel: CancelReceiver) -> TwapReport {
        let run_start = self.clock.now();
        let mut records = Vec::with_capacity(plan.chunk_count as usize);
        let mut aborted_by = None;
        let mut phase = TwapPhase::Running;
        tracing::info!(symbol = %plan.symbol, phase = ?phase, "TWAP started");

        for index in 0..plan.chunk_count {
            if is_cancelled(&cancel) {
                phase = TwapPhase::Cancelled;
                break;
            }

            let chunk_start = self.clock.now();
            let quantity = plan.quantity_for(index);
            let request = OrderRequest::market(plan.symbol.clone(), plan.side, quantity);
            let result = self.submit_chunk(&request).await;

            match &result {
                ChunkResult::Executed(outcome) => tracing::info!(
                    chunk = index + 1,
                    of = plan.chunk_count,
                    order_id = outcome.order_id,
                    status = %outcome.status,
                    filled = %outcome.filled_quantity,
                    price = ?outcome.average_price,
                    "TWAP chunk executed"
                ),
                ChunkResult::Failed(e) => tracing::warn!(
                    chunk = index + 1,
                    of = plan.chunk_count,
                    quantity = %quantity,
                    kind = e.kind(),
                    error = %e,
                    "TWAP chunk failed"
                ),
            }

            let fatal = match &result {
                ChunkResult::Failed(e) if e.is_fatal() => Some(e.clone()),
                _ => None,
            };
            records.push(ChunkRecord {
                index,
                requested_quantity: quantity,
                result,
                timestamp: Utc::now(),
                offset: chunk_start.saturating_duration_since(run_start),
            });

            if let Some(e) = fatal {
                tracing::error!(chunk = index + 1, error = %e, "TWAP aborted");
                aborted_by = Some(e);
                phase = TwapPhase::Aborted;
                break;
            }

            if index + 1 < plan.chunk_count {
                let elapsed = self.clock.now().saturating_duration_since(chunk_start);
                let wait = plan.interval.saturating_sub(elapsed);
                if sleep_or_cancelled(self.clock.as_ref(), wait, &mut cancel).await {
                    phase = TwapPhase::Cancelled;
                    break;
                }
            }
        }

        if phase == TwapPhase::Running {
            phase = TwapPhase::Completed;
        }

        let stats = TwapStats::from_records(&records);
        let elapsed = self.clock.now().saturating_duration_since(run_start);
        tracing::info!(
            symbol = %plan.symbol,
            phase = ?phase,
            chunks_done = records.len(),
            succeeded = stats.succeeded,
            failed = stats.failed,
            total_filled = %stats.total_filled,
            vwap = ?stats.vwap,
            "TWAP finished"
        );

        TwapReport {
            plan,
            phase,
            records,
            stats,
            aborted_by,
            elapsed,
        }
    }

    /// Submit one market chunk; a non-terminal acknowledgement is re-queried once.
    async fn submit_chunk(&self, request: &OrderRequest) -> ChunkResult {
        let outcome = match self.gateway.submit_order(request).await {
            Ok(outcome) => outcome,
            Err(e) => return ChunkResult::Failed(e),
        };
        if outcome.status.is_terminal() {
            return ChunkResult::Executed(outcome);
        }

        match self
            .gateway
            .get_order_status(&outcome.symbol, outcome.order_id)
            .await
        {
            Ok(latest) => ChunkResult::Executed(latest),
            Err(e) => {
                tracing::warn!(order_id = outcome.order_id, error = %e, "Chunk status refresh failed");
                ChunkResult::Executed(outcome)
            }
        }
    }
}
