//! Client-side one-cancels-other supervision for a placed take-profit / stop-loss pair.
//!
//! Futures has no native OCO, so the pair is polled: the first leg to fill has its
//! counterpart cancelled.

use crate::orders::OcoOutcome;
use connector_core::{GatewayError, SharedGateway};
use execution_core::{OrderOutcome, OrderStatus};
use std::time::Duration;
use strategy_core::{sleep_or_cancelled, CancelReceiver, SharedClock};

pub const DEFAULT_OCO_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcoLeg {
    TakeProfit,
    StopLoss,
}

impl std::fmt::Display for OcoLeg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TakeProfit => write!(f, "take-profit"),
            Self::StopLoss => write!(f, "stop-loss"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OcoResolution {
    /// `leg` filled. `counterpart_closed` is false if cancelling the other leg failed.
    Filled {
        leg: OcoLeg,
        fill: OrderOutcome,
        counterpart_closed: bool,
    },
    /// Both legs ended without a fill (cancelled or expired elsewhere).
    Closed,
    /// Watching stopped on request; both legs are left as they are.
    Stopped,
}

pub struct OcoMonitor {
    gateway: SharedGateway,
    clock: SharedClock,
    poll_interval: Duration,
}

impl OcoMonitor {
    pub fn new(gateway: SharedGateway, clock: SharedClock, poll_interval: Duration) -> Self {
        Self {
            gateway,
            clock,
            poll_interval,
        }
    }

    /// Poll both legs until one fills, both close, or `cancel` fires.
    ///
    /// Transient status failures are logged and retried on the next poll; only a fatal
    /// gateway error ends the watch early.
    pub async fn watch(
        &self,
        oco: &OcoOutcome,
        mut cancel: CancelReceiver,
    ) -> Result<OcoResolution, GatewayError> {
        let legs = [
            (OcoLeg::TakeProfit, &oco.take_profit, &oco.stop_loss),
            (OcoLeg::StopLoss, &oco.stop_loss, &oco.take_profit),
        ];
        tracing::info!(
            symbol = %oco.take_profit.symbol,
            take_profit_id = oco.take_profit.order_id,
            stop_loss_id = oco.stop_loss.order_id,
            "Monitoring OCO pair"
        );

        loop {
            let mut closed = 0;
            for (leg, order, counterpart) in legs {
                match self
                    .gateway
                    .get_order_status(&order.symbol, order.order_id)
                    .await
                {
                    Ok(status) if status.status == OrderStatus::Filled => {
                        tracing::info!(%leg, order_id = order.order_id, "OCO leg filled");
                        let counterpart_closed = self.cancel_counterpart(counterpart).await;
                        return Ok(OcoResolution::Filled {
                            leg,
                            fill: status,
                            counterpart_closed,
                        });
                    }
                    Ok(status) if !status.status.is_active() => closed += 1,
                    Ok(_) => {}
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        tracing::warn!(%leg, order_id = order.order_id, error = %e, "OCO status poll failed");
                    }
                }
            }

            if closed == legs.len() {
                tracing::warn!(symbol = %oco.take_profit.symbol, "Both OCO legs closed without a fill");
                return Ok(OcoResolution::Closed);
            }
            if sleep_or_cancelled(self.clock.as_ref(), self.poll_interval, &mut cancel).await {
                tracing::info!(symbol = %oco.take_profit.symbol, "OCO monitoring stopped, orders left open");
                return Ok(OcoResolution::Stopped);
            }
        }
    }

    async fn cancel_counterpart(&self, order: &OrderOutcome) -> bool {
        match self
            .gateway
            .cancel_order(&order.symbol, order.order_id)
            .await
        {
            Ok(()) | Err(GatewayError::AlreadyClosed { .. }) => {
                tracing::info!(order_id = order.order_id, "OCO counterpart cancelled");
                true
            }
            Err(e) => {
                tracing::error!(order_id = order.order_id, error = %e, "Failed to cancel OCO counterpart");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::OrderEntry;
    use crate::test_support::MockGateway;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use strategy_core::{ManualClock, MetadataCache};
    use tokio::sync::watch;

    /// SELL pair on BTCUSDT: take-profit is order 1, stop-loss is order 2.
    async fn placed(gateway: &Arc<MockGateway>) -> OcoOutcome {
        let cache = Arc::new(MetadataCache::new(
            gateway.clone(),
            Arc::new(ManualClock::new()),
            Duration::from_secs(300),
        ));
        OrderEntry::new(gateway.clone(), cache)
            .place_oco_order("BTCUSDT", "sell", dec!(0.01), dec!(52000), dec!(48000), dec!(47900))
            .await
            .unwrap()
    }

    fn monitor(gateway: &Arc<MockGateway>, clock: &Arc<ManualClock>) -> OcoMonitor {
        OcoMonitor::new(gateway.clone(), clock.clone(), DEFAULT_OCO_POLL_INTERVAL)
    }

    #[tokio::test]
    async fn test_take_profit_fill_cancels_stop_loss() {
        let gateway = MockGateway::new(dec!(50000));
        let clock = Arc::new(ManualClock::new());
        let oco = placed(&gateway).await;
        let (_tx, rx) = watch::channel(false);

        let filler = {
            let gateway = gateway.clone();
            let clock = clock.clone();
            tokio::spawn(async move {
                while clock.elapsed() < Duration::from_secs(3) {
                    tokio::task::yield_now().await;
                }
                gateway.fill(1);
            })
        };

        let resolution = monitor(&gateway, &clock).watch(&oco, rx).await.unwrap();
        filler.await.unwrap();

        match resolution {
            OcoResolution::Filled {
                leg,
                fill,
                counterpart_closed,
            } => {
                assert_eq!(leg, OcoLeg::TakeProfit);
                assert_eq!(fill.order_id, 1);
                assert!(counterpart_closed);
            }
            other => panic!("unexpected resolution: {:?}", other),
        }
        assert_eq!(gateway.cancels(), vec![2]);
        assert!(gateway.open_orders().is_empty());
        assert!(clock.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_stop_loss_fill_cancels_take_profit() {
        let gateway = MockGateway::new(dec!(50000));
        let clock = Arc::new(ManualClock::new());
        let oco = placed(&gateway).await;
        gateway.fill(2);
        let (_tx, rx) = watch::channel(false);

        let resolution = monitor(&gateway, &clock).watch(&oco, rx).await.unwrap();

        assert!(matches!(
            resolution,
            OcoResolution::Filled {
                leg: OcoLeg::StopLoss,
                counterpart_closed: true,
                ..
            }
        ));
        assert_eq!(gateway.cancels(), vec![1]);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_stop_leaves_both_legs_open() {
        let gateway = MockGateway::new(dec!(50000));
        let clock = Arc::new(ManualClock::new());
        let oco = placed(&gateway).await;
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let resolution = monitor(&gateway, &clock).watch(&oco, rx).await.unwrap();

        assert_eq!(resolution, OcoResolution::Stopped);
        assert!(gateway.cancels().is_empty());
        assert_eq!(gateway.open_orders().len(), 2);
    }

    #[tokio::test]
    async fn test_both_legs_closed_elsewhere() {
        let gateway = MockGateway::new(dec!(50000));
        let clock = Arc::new(ManualClock::new());
        let oco = placed(&gateway).await;
        gateway.set_status(1, OrderStatus::Canceled);
        gateway.set_status(2, OrderStatus::Expired);
        let (_tx, rx) = watch::channel(false);

        let resolution = monitor(&gateway, &clock).watch(&oco, rx).await.unwrap();

        assert_eq!(resolution, OcoResolution::Closed);
        assert!(gateway.cancels().is_empty());
    }

    #[tokio::test]
    async fn test_transient_poll_error_keeps_watching_fatal_ends() {
        let gateway = MockGateway::new(dec!(50000));
        let clock = Arc::new(ManualClock::new());
        let oco = placed(&gateway).await;
        let (_tx, rx) = watch::channel(false);

        gateway.fail_status(1, GatewayError::Network("timeout".into()));
        gateway.fill(2);
        let resolution = monitor(&gateway, &clock).watch(&oco, rx.clone()).await.unwrap();
        assert!(matches!(
            resolution,
            OcoResolution::Filled {
                leg: OcoLeg::StopLoss,
                ..
            }
        ));

        let oco = placed(&gateway).await;
        gateway.fail_status(oco.take_profit.order_id, GatewayError::Auth("Invalid API-key".into()));
        let err = monitor(&gateway, &clock).watch(&oco, rx).await.unwrap_err();
        assert!(err.is_fatal());
    }
}
