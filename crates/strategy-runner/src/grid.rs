//! Ladder strategy: resting limit orders on a fixed price grid.
//!
//! `Initializing → Active ⇄ (fill handling) → ShuttingDown → Stopped`. A filled buy is
//! replaced by a sell one level up; a filled sell by a buy one level down, booking
//! `(sell level - level below) * quantity` as realized profit. A stopped grid is terminal.

use crate::balance::{available_balance, BALANCE_ASSET};
use connector_core::{ExchangeGateway, GatewayError, SharedGateway};
use execution_core::{OrderRequest, OrderStatus, Side, TimeInForce};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::time::Duration;
use strategy_core::{
    sleep_or_cancelled, validate_notional, validate_price, validate_quantity, validate_symbol,
    CancelReceiver, MetadataCache, SharedClock, StrategyError, ValidationError,
};

pub const DEFAULT_GRID_LEVELS: usize = 10;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// A status line is logged every this many monitoring ticks.
pub const STATUS_EVERY_TICKS: u64 = 12;

/// `n` prices linearly spaced over `[lower, upper]`, both ends included.
pub fn compute_grid_levels(
    lower: Decimal,
    upper: Decimal,
    n: usize,
) -> Result<Vec<Decimal>, ValidationError> {
    let invalid = |reason: &str| ValidationError::GridRange {
        lower,
        upper,
        levels: n,
        reason: reason.to_string(),
    };
    if upper <= lower {
        return Err(invalid("upper bound must be above lower bound"));
    }
    if n < 2 {
        return Err(invalid("at least 2 levels are required"));
    }

    let span = upper
        .checked_sub(lower)
        .ok_or_else(|| invalid("range too large"))?;
    let intervals = Decimal::from(n - 1);
    (0..n)
        .map(|i| {
            span.checked_mul(Decimal::from(i))
                .and_then(|offset| offset.checked_div(intervals))
                .and_then(|offset| lower.checked_add(offset))
                .ok_or_else(|| invalid("range too large"))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridPhase {
    Initializing,
    Active,
    ShuttingDown,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct GridParams {
    pub symbol: String,
    pub lower: Decimal,
    pub upper: Decimal,
    pub levels: usize,
    /// Quantity of every order on the grid.
    pub quantity: Decimal,
    pub poll_interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridLevel {
    pub index: usize,
    pub price: Decimal,
    /// Side of the order resting here. When empty, the side queued for placement, if any.
    pub side: Option<Side>,
    pub order_id: Option<u64>,
}

/// An order the grid wants resting but has not placed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingPlacement {
    level: usize,
    side: Side,
}

/// Mutated only by the owning [`GridTrader`].
#[derive(Debug, Clone)]
pub struct GridState {
    /// Price-ascending with unique prices.
    pub levels: Vec<GridLevel>,
    pub realized_profit: Decimal,
    pub phase: GridPhase,
    pub buys_filled: u32,
    pub sells_filled: u32,
    pending: Vec<PendingPlacement>,
}

impl GridState {
    pub fn open_orders(&self) -> usize {
        self.levels.iter().filter(|l| l.order_id.is_some()).count()
    }

    /// Placements waiting for a free level or a successful retry.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn status(&self) -> GridStatus {
        let resting = |side| {
            self.levels
                .iter()
                .filter(|l| l.order_id.is_some() && l.side == Some(side))
                .count()
        };
        GridStatus {
            open_buys: resting(Side::Buy),
            open_sells: resting(Side::Sell),
            buys_filled: self.buys_filled,
            sells_filled: self.sells_filled,
            realized_profit: self.realized_profit,
        }
    }

    /// Queue a placement; an empty level takes the queued side.
    fn queue(&mut self, level: usize, side: Side) {
        let placement = PendingPlacement { level, side };
        if !self.pending.contains(&placement) {
            self.pending.push(placement);
        }
        let slot = &mut self.levels[level];
        if slot.order_id.is_none() {
            slot.side = Some(side);
        }
    }

    /// Forget the level's order. The level keeps showing a side only if one is still queued for it.
    fn clear_level(&mut self, index: usize) {
        let queued = self
            .pending
            .iter()
            .find(|p| p.level == index)
            .map(|p| p.side);
        let level = &mut self.levels[index];
        level.order_id = None;
        level.side = queued;
    }
}

/// Point-in-time counters for the periodic status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridStatus {
    pub open_buys: usize,
    pub open_sells: usize,
    pub buys_filled: u32,
    pub sells_filled: u32,
    pub realized_profit: Decimal,
}

#[derive(Debug, Clone)]
pub struct GridReport {
    pub symbol: String,
    pub realized_profit: Decimal,
    pub buys_filled: u32,
    pub sells_filled: u32,
    pub orders_cancelled: usize,
    pub open_orders_remaining: usize,
    pub phase: GridPhase,
    pub aborted_by: Option<GatewayError>,
}

pub struct GridTrader {
    gateway: SharedGateway,
    clock: SharedClock,
    symbol: String,
    quantity: Decimal,
    poll_interval: Duration,
    state: GridState,
    balance_shortfall: Option<Decimal>,
}

impl GridTrader {
    /// Validate the grid and classify each level against the current price.
    ///
    /// Levels below the price will buy, levels above will sell, and a level exactly at
    /// the price stays empty. No orders are placed here.
    pub async fn initialize(
        gateway: SharedGateway,
        cache: &MetadataCache,
        clock: SharedClock,
        params: &GridParams,
    ) -> Result<Self, StrategyError> {
        let metadata = validate_symbol(cache, &params.symbol).await?;
        let quantity = validate_quantity(params.quantity, &metadata)?;
        let raw = compute_grid_levels(params.lower, params.upper, params.levels)?;

        let mut prices = Vec::with_capacity(raw.len());
        for price in raw {
            prices.push(validate_price(price, &metadata)?);
        }
        if prices.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ValidationError::GridRange {
                lower: params.lower,
                upper: params.upper,
                levels: params.levels,
                reason: format!(
                    "adjacent levels collapse at tick size {}",
                    metadata.tick_size
                ),
            }
            .into());
        }

        // Lowest level has the smallest notional; the highest must still be representable.
        validate_notional(quantity, prices[0], &metadata)?;
        if let Some(highest) = prices.last() {
            validate_notional(quantity, *highest, &metadata)?;
        }

        let current = gateway
            .get_current_price(&metadata.symbol)
            .await
            .map_err(StrategyError::gateway("get_current_price"))?;

        let mut state = GridState {
            levels: Vec::with_capacity(prices.len()),
            realized_profit: Decimal::ZERO,
            phase: GridPhase::Initializing,
            buys_filled: 0,
            sells_filled: 0,
            pending: Vec::new(),
        };
        for (index, price) in prices.into_iter().enumerate() {
            let side = match price.cmp(&current) {
                Ordering::Less => Some(Side::Buy),
                Ordering::Greater => Some(Side::Sell),
                Ordering::Equal => None,
            };
            state.levels.push(GridLevel {
                index,
                price,
                side: None,
                order_id: None,
            });
            if let Some(side) = side {
                state.queue(index, side);
            }
        }

        let buy_levels = state
            .levels
            .iter()
            .filter(|l| l.side == Some(Side::Buy))
            .count();
        let balance_shortfall =
            Self::balance_shortfall_for(gateway.as_ref(), buy_levels, quantity, current).await?;

        tracing::info!(
            symbol = %metadata.symbol,
            lower = %params.lower,
            upper = %params.upper,
            levels = state.levels.len(),
            quantity = %quantity,
            current_price = %current,
            "Grid initialized"
        );

        Ok(Self {
            gateway,
            clock,
            symbol: metadata.symbol,
            quantity,
            poll_interval: params.poll_interval,
            state,
            balance_shortfall,
        })
    }

    /// Estimated cost of every initial buy at the current price, less the available balance.
    ///
    /// A shortfall is a warning: the grid still starts and the buys that cannot be funded
    /// fail and retry like any other placement. Only a fatal balance error is returned.
    async fn balance_shortfall_for(
        gateway: &dyn ExchangeGateway,
        buy_levels: usize,
        quantity: Decimal,
        current: Decimal,
    ) -> Result<Option<Decimal>, StrategyError> {
        let required = Decimal::from(buy_levels)
            .saturating_mul(quantity)
            .saturating_mul(current);
        let available = match available_balance(gateway).await {
            Ok(available) => available,
            Err(e) if e.gateway_error().is_some_and(GatewayError::is_fatal) => return Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "Balance unavailable, grid cost not checked");
                return Ok(None);
            }
        };
        if required <= available {
            return Ok(None);
        }
        tracing::warn!(
            estimated_cost = %required.round_dp(2),
            available = %available,
            asset = BALANCE_ASSET,
            "Grid buy cost exceeds balance, some buy orders may fail"
        );
        Ok(Some(required - available))
    }

    pub fn state(&self) -> &GridState {
        &self.state
    }

    /// How far the initial buys' estimated cost exceeded the balance at startup.
    pub fn balance_shortfall(&self) -> Option<Decimal> {
        self.balance_shortfall
    }

    /// Place the initial ladder. Levels whose placement fails are retried on later ticks.
    pub async fn activate(&mut self) -> Result<(), GatewayError> {
        self.state.phase = GridPhase::Active;
        self.place_pending().await?;
        tracing::info!(
            symbol = %self.symbol,
            open_orders = self.state.open_orders(),
            pending = self.state.pending_count(),
            "Grid active"
        );
        Ok(())
    }

    /// One monitoring tick: refresh every tracked order, handle fills, retry pending placements.
    ///
    /// Only a fatal gateway error is returned; anything else is logged and retried next tick.
    pub async fn poll_once(&mut self) -> Result<(), GatewayError> {
        for index in 0..self.state.levels.len() {
            let Some(order_id) = self.state.levels[index].order_id else {
                continue;
            };

            let outcome = match self.gateway.get_order_status(&self.symbol, order_id).await {
                Ok(outcome) => outcome,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(order_id, level = index, error = %e, "Grid status check failed");
                    continue;
                }
            };

            match outcome.status {
                OrderStatus::Filled => self.on_fill(index, outcome.side),
                OrderStatus::Canceled | OrderStatus::Rejected | OrderStatus::Expired => {
                    tracing::warn!(
                        order_id,
                        level = index,
                        status = %outcome.status,
                        "Grid order closed without fill, level cleared"
                    );
                    self.state.clear_level(index);
                }
                OrderStatus::New | OrderStatus::PartiallyFilled => {}
            }
        }

        self.place_pending().await
    }

    fn on_fill(&mut self, index: usize, side: Side) {
        let price = self.state.levels[index].price;
        self.state.clear_level(index);

        match side {
            Side::Buy => {
                self.state.buys_filled += 1;
                tracing::info!(level = index, price = %price, "Grid buy filled");
                if index + 1 < self.state.levels.len() {
                    self.state.queue(index + 1, Side::Sell);
                } else {
                    tracing::info!(level = index, "Buy filled at top level, no sell counterpart");
                }
            }
            Side::Sell => {
                self.state.sells_filled += 1;
                if index > 0 {
                    let paired = self.state.levels[index - 1].price;
                    let profit = (price - paired) * self.quantity;
                    self.state.realized_profit += profit;
                    tracing::info!(
                        level = index,
                        price = %price,
                        paired_buy = %paired,
                        profit = %profit,
                        realized_profit = %self.state.realized_profit,
                        "Grid sell filled"
                    );
                    self.state.queue(index - 1, Side::Buy);
                } else {
                    tracing::info!(level = index, price = %price, "Sell filled at bottom level, no buy counterpart");
                }
            }
        }
    }

    /// Try every queued placement. A placement whose level still holds an order stays queued.
    async fn place_pending(&mut self) -> Result<(), GatewayError> {
        let queued = std::mem::take(&mut self.state.pending);
        let mut remaining = Vec::new();
        let mut fatal = None;

        for placement in queued {
            if fatal.is_some() || self.state.levels[placement.level].order_id.is_some() {
                remaining.push(placement);
                continue;
            }

            let price = self.state.levels[placement.level].price;
            let request = OrderRequest::limit(
                self.symbol.clone(),
                placement.side,
                self.quantity,
                price,
                TimeInForce::GTC,
            );
            match self.gateway.submit_order(&request).await {
                Ok(outcome) => {
                    tracing::info!(
                        level = placement.level,
                        side = %placement.side,
                        price = %price,
                        order_id = outcome.order_id,
                        "Grid order placed"
                    );
                    let level = &mut self.state.levels[placement.level];
                    level.order_id = Some(outcome.order_id);
                    level.side = Some(placement.side);
                }
                Err(e) => {
                    tracing::warn!(
                        level = placement.level,
                        side = %placement.side,
                        price = %price,
                        kind = e.kind(),
                        error = %e,
                        "Grid order placement failed, will retry"
                    );
                    if e.is_fatal() {
                        fatal = Some(e);
                    }
                    remaining.push(placement);
                }
            }
        }

        self.state.pending = remaining;
        match fatal {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn log_status(&self) {
        let current_price = match self.gateway.get_current_price(&self.symbol).await {
            Ok(price) => Some(price),
            Err(e) => {
                tracing::warn!(symbol = %self.symbol, error = %e, "Grid status price unavailable");
                None
            }
        };
        let status = self.state.status();
        tracing::info!(
            symbol = %self.symbol,
            current_price = ?current_price,
            open_buys = status.open_buys,
            open_sells = status.open_sells,
            buys_filled = status.buys_filled,
            sells_filled = status.sells_filled,
            realized_profit = %status.realized_profit,
            pending = self.state.pending_count(),
            "Grid status"
        );
    }

    /// Cancel every live order, best-effort, and produce the final report.
    pub async fn shutdown(mut self, aborted_by: Option<GatewayError>) -> GridReport {
        self.state.phase = GridPhase::ShuttingDown;
        tracing::info!(symbol = %self.symbol, open_orders = self.state.open_orders(), "Grid shutting down");

        let mut orders_cancelled = 0;
        for level in self.state.levels.iter_mut() {
            let Some(order_id) = level.order_id else {
                continue;
            };
            match self.gateway.cancel_order(&self.symbol, order_id).await {
                Ok(()) => {
                    orders_cancelled += 1;
                    level.order_id = None;
                }
                Err(GatewayError::AlreadyClosed { .. }) => {
                    tracing::info!(order_id, "Grid order already closed");
                    level.order_id = None;
                }
                Err(e) => {
                    tracing::warn!(order_id, level = level.index, error = %e, "Grid cancel failed");
                }
            }
        }

        self.state.phase = GridPhase::Stopped;
        let report = GridReport {
            symbol: self.symbol,
            realized_profit: self.state.realized_profit,
            buys_filled: self.state.buys_filled,
            sells_filled: self.state.sells_filled,
            orders_cancelled,
            open_orders_remaining: self.state.open_orders(),
            phase: self.state.phase,
            aborted_by,
        };
        tracing::info!(
            symbol = %report.symbol,
            realized_profit = %report.realized_profit,
            buys_filled = report.buys_filled,
            sells_filled = report.sells_filled,
            orders_cancelled = report.orders_cancelled,
            open_orders_remaining = report.open_orders_remaining,
            aborted = report.aborted_by.is_some(),
            "Grid stopped"
        );
        report
    }

    /// Activate, poll until `stop` flips or a fatal error occurs, then shut down.
    pub async fn run(mut self, mut stop: CancelReceiver) -> GridReport {
        let mut aborted_by = self.activate().await.err();
        let mut ticks: u64 = 0;

        while aborted_by.is_none() {
            if sleep_or_cancelled(self.clock.as_ref(), self.poll_interval, &mut stop).await {
                tracing::info!(symbol = %self.symbol, "Grid stop requested");
                break;
            }
            aborted_by = self.poll_once().await.err();
            ticks += 1;
            if aborted_by.is_none() && ticks % STATUS_EVERY_TICKS == 0 {
                self.log_status().await;
            }
        }

        if let Some(e) = &aborted_by {
            tracing::error!(symbol = %self.symbol, error = %e, "Grid aborted");
        }
        self.shutdown(aborted_by).await
    }
}
