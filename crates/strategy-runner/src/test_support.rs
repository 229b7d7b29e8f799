//! Scriptable in-memory exchange for the strategy tests.

use async_trait::async_trait;
use chrono::Utc;
use connector_core::{ExchangeGateway, GatewayError};
use execution_core::{OrderKind, OrderOutcome, OrderRequest, OrderStatus, SymbolMetadata};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

pub(crate) fn btc_metadata() -> SymbolMetadata {
    SymbolMetadata {
        symbol: "BTCUSDT".into(),
        step_size: dec!(0.001),
        min_qty: dec!(0.001),
        max_qty: dec!(1000),
        tick_size: dec!(0.1),
        min_notional: dec!(5),
        trading_enabled: true,
    }
}

type SubmitHook = Box<dyn FnMut(usize, &OrderRequest) + Send>;

/// Market orders fill at the current price unless a scripted result is queued.
/// Limit and stop orders rest until the test fills them with [`MockGateway::fill`].
pub(crate) struct MockGateway {
    metadata: SymbolMetadata,
    price: Mutex<Decimal>,
    next_id: AtomicU64,
    submissions: Mutex<Vec<OrderRequest>>,
    /// `Ok(price)` fills the next market order at `price`; `Err` fails the next submit.
    submit_script: Mutex<VecDeque<Result<Decimal, GatewayError>>>,
    orders: Mutex<HashMap<u64, OrderOutcome>>,
    status_errors: Mutex<HashMap<u64, GatewayError>>,
    cancel_errors: Mutex<HashMap<u64, GatewayError>>,
    cancels: Mutex<Vec<u64>>,
    on_submit: Mutex<Option<SubmitHook>>,
    price_reads: AtomicUsize,
    balance: Mutex<Decimal>,
    balance_error: Mutex<Option<GatewayError>>,
}

impl MockGateway {
    pub(crate) fn new(price: Decimal) -> Arc<Self> {
        Self::with_metadata(btc_metadata(), price)
    }

    pub(crate) fn with_metadata(metadata: SymbolMetadata, price: Decimal) -> Arc<Self> {
        Arc::new(Self {
            metadata,
            price: Mutex::new(price),
            next_id: AtomicU64::new(1),
            submissions: Mutex::new(Vec::new()),
            submit_script: Mutex::new(VecDeque::new()),
            orders: Mutex::new(HashMap::new()),
            status_errors: Mutex::new(HashMap::new()),
            cancel_errors: Mutex::new(HashMap::new()),
            cancels: Mutex::new(Vec::new()),
            on_submit: Mutex::new(None),
            price_reads: AtomicUsize::new(0),
            balance: Mutex::new(dec!(1000000000)),
            balance_error: Mutex::new(None),
        })
    }

    pub(crate) fn set_price(&self, price: Decimal) {
        *self.price.lock() = price;
    }

    /// Available USDT reported by `get_available_balance`.
    pub(crate) fn set_balance(&self, balance: Decimal) {
        *self.balance.lock() = balance;
    }

    pub(crate) fn fail_balance(&self, err: GatewayError) {
        *self.balance_error.lock() = Some(err);
    }

    pub(crate) fn price_reads(&self) -> usize {
        self.price_reads.load(Ordering::SeqCst)
    }

    pub(crate) fn script_submits(&self, results: Vec<Result<Decimal, GatewayError>>) {
        self.submit_script.lock().extend(results);
    }

    pub(crate) fn on_submit(&self, hook: impl FnMut(usize, &OrderRequest) + Send + 'static) {
        *self.on_submit.lock() = Some(Box::new(hook));
    }

    pub(crate) fn fail_status(&self, order_id: u64, err: GatewayError) {
        self.status_errors.lock().insert(order_id, err);
    }

    pub(crate) fn fail_cancel(&self, order_id: u64, err: GatewayError) {
        self.cancel_errors.lock().insert(order_id, err);
    }

    pub(crate) fn submissions(&self) -> Vec<OrderRequest> {
        self.submissions.lock().clone()
    }

    pub(crate) fn cancels(&self) -> Vec<u64> {
        self.cancels.lock().clone()
    }

    /// Mark a resting order fully filled at its limit price.
    pub(crate) fn fill(&self, order_id: u64) {
        self.set_status(order_id, OrderStatus::Filled);
    }

    pub(crate) fn set_status(&self, order_id: u64, status: OrderStatus) {
        let mut orders = self.orders.lock();
        if let Some(order) = orders.get_mut(&order_id) {
            order.status = status;
            if status == OrderStatus::Filled {
                let qty = self
                    .submissions
                    .lock()
                    .get((order_id - 1) as usize)
                    .map(|r| (r.quantity, r.price));
                if let Some((qty, price)) = qty {
                    order.filled_quantity = qty;
                    order.average_price = price;
                }
            }
        }
    }

    /// Open orders as `(order_id, request)`.
    pub(crate) fn open_orders(&self) -> Vec<(u64, OrderRequest)> {
        let orders = self.orders.lock();
        let submissions = self.submissions.lock();
        let mut open: Vec<_> = orders
            .values()
            .filter(|o| o.status.is_active())
            .filter_map(|o| {
                submissions
                    .get((o.order_id - 1) as usize)
                    .map(|r| (o.order_id, r.clone()))
            })
            .collect();
        open.sort_by_key(|(id, _)| *id);
        open
    }

    /// The open order resting at `price`, if any.
    pub(crate) fn order_at(&self, price: Decimal) -> Option<(u64, OrderRequest)> {
        self.open_orders()
            .into_iter()
            .find(|(_, r)| r.price == Some(price))
    }
}

#[async_trait]
impl ExchangeGateway for MockGateway {
    async fn get_symbol_filters(&self, symbol: &str) -> Result<SymbolMetadata, GatewayError> {
        if symbol == self.metadata.symbol {
            Ok(self.metadata.clone())
        } else {
            Err(GatewayError::UnknownSymbol(symbol.to_string()))
        }
    }

    async fn submit_order(&self, request: &OrderRequest) -> Result<OrderOutcome, GatewayError> {
        // Every attempt consumes an id so ids line up with submission indices.
        let order_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let index = {
            let mut submissions = self.submissions.lock();
            submissions.push(request.clone());
            submissions.len() - 1
        };
        if let Some(hook) = self.on_submit.lock().as_mut() {
            hook(index, request);
        }

        let scripted = self.submit_script.lock().pop_front();
        let fill_price = match scripted {
            Some(Err(e)) => return Err(e),
            Some(Ok(price)) => price,
            None => *self.price.lock(),
        };

        let market = request.kind == OrderKind::Market;
        let outcome = OrderOutcome {
            order_id,
            client_order_id: format!("mock_{}", order_id),
            symbol: request.symbol.clone(),
            side: request.side,
            status: if market {
                OrderStatus::Filled
            } else {
                OrderStatus::New
            },
            filled_quantity: if market { request.quantity } else { Decimal::ZERO },
            average_price: market.then_some(fill_price),
            updated_at: Utc::now(),
        };
        self.orders.lock().insert(order_id, outcome.clone());
        Ok(outcome)
    }

    async fn get_order_status(
        &self,
        _symbol: &str,
        order_id: u64,
    ) -> Result<OrderOutcome, GatewayError> {
        if let Some(err) = self.status_errors.lock().remove(&order_id) {
            return Err(err);
        }
        self.orders
            .lock()
            .get(&order_id)
            .cloned()
            .ok_or(GatewayError::Rejection {
                code: -2013,
                message: "Order does not exist.".into(),
            })
    }

    async fn cancel_order(&self, _symbol: &str, order_id: u64) -> Result<(), GatewayError> {
        self.cancels.lock().push(order_id);
        if let Some(err) = self.cancel_errors.lock().remove(&order_id) {
            return Err(err);
        }
        let mut orders = self.orders.lock();
        match orders.get_mut(&order_id) {
            Some(order) if order.status.is_active() => {
                order.status = OrderStatus::Canceled;
                Ok(())
            }
            _ => Err(GatewayError::AlreadyClosed { order_id }),
        }
    }

    async fn get_current_price(&self, _symbol: &str) -> Result<Decimal, GatewayError> {
        self.price_reads.fetch_add(1, Ordering::SeqCst);
        Ok(*self.price.lock())
    }

    async fn get_available_balance(&self, _asset: &str) -> Result<Decimal, GatewayError> {
        if let Some(err) = self.balance_error.lock().take() {
            return Err(err);
        }
        Ok(*self.balance.lock())
    }
}
