use crate::client::BinanceFuturesClient;
use crate::error::BinanceFuturesError;
use async_trait::async_trait;
use auth::ApiCredentials;
use common::{retry_with_backoff, RetryPolicy};
use connector_core::{ExchangeGateway, GatewayConfig, GatewayError};
use execution_core::{generate_client_order_id, OrderOutcome, OrderRequest, SymbolMetadata};
use rust_decimal::Decimal;

const CLIENT_ORDER_PREFIX: &str = "fbot";

/// [`ExchangeGateway`] backed by the live futures REST API.
///
/// Every call goes through the configured [`RetryPolicy`]; only `Network` and
/// `RateLimit` failures are retried.
#[derive(Debug)]
pub struct BinanceFuturesGateway {
    client: BinanceFuturesClient,
    retry: RetryPolicy,
}

impl BinanceFuturesGateway {
    pub fn new(
        credentials: ApiCredentials,
        config: &GatewayConfig,
    ) -> Result<Self, BinanceFuturesError> {
        let client = BinanceFuturesClient::new(
            credentials,
            config.environment,
            config.recv_window_ms,
            config.request_timeout,
        )?;
        Ok(Self {
            client,
            retry: config.retry.clone(),
        })
    }

    /// Build the gateway and align the signing clock with the exchange.
    ///
    /// A failed time sync is logged, not fatal; the next drift rejection retries it.
    pub async fn connect(
        credentials: ApiCredentials,
        config: &GatewayConfig,
    ) -> Result<Self, BinanceFuturesError> {
        let gateway = Self::new(credentials, config)?;
        if let Err(e) = gateway.client.sync_time().await {
            tracing::warn!(error = %e, "Initial time sync failed, using local clock");
        }
        tracing::info!(environment = %config.environment, "Futures gateway ready");
        Ok(gateway)
    }

    pub fn client(&self) -> &BinanceFuturesClient {
        &self.client
    }

    async fn lift(&self, operation: &str, err: BinanceFuturesError, symbol: &str) -> GatewayError {
        self.resync_on_drift(&err).await;
        let classified = err.classify(symbol);
        tracing::debug!(operation, symbol, kind = classified.kind(), error = %err, "Gateway call failed");
        classified
    }

    async fn resync_on_drift(&self, err: &BinanceFuturesError) {
        if err.is_timestamp_drift() {
            if let Err(e) = self.client.sync_time().await {
                tracing::warn!(error = %e, "Time resync after drift rejection failed");
            }
        }
    }
}

#[async_trait]
impl ExchangeGateway for BinanceFuturesGateway {
    async fn get_symbol_filters(&self, symbol: &str) -> Result<SymbolMetadata, GatewayError> {
        let info = retry_with_backoff(&self.retry, "get_symbol_filters", move || async move {
            match self.client.exchange_info().await {
                Ok(info) => Ok(info),
                Err(e) => Err(self.lift("get_symbol_filters", e, symbol).await),
            }
        })
        .await?;

        let entry = info
            .symbols
            .iter()
            .find(|s| s.symbol == symbol)
            .ok_or_else(|| GatewayError::UnknownSymbol(symbol.to_string()))?;

        entry
            .to_metadata()
            .map_err(|e| GatewayError::Unknown(e.to_string()))
    }

    async fn submit_order(&self, request: &OrderRequest) -> Result<OrderOutcome, GatewayError> {
        // Fixed across retries so a resend after a lost response cannot double-fill.
        let client_order_id = generate_client_order_id(CLIENT_ORDER_PREFIX);
        let cid = client_order_id.as_str();
        let symbol = request.symbol.as_str();

        let response = retry_with_backoff(&self.retry, "submit_order", move || async move {
            match self.client.place_order(request, cid).await {
                Ok(r) => Ok(r),
                Err(e) => Err(self.lift("submit_order", e, symbol).await),
            }
        })
        .await?;

        response
            .to_outcome()
            .map_err(|e| GatewayError::Unknown(e.to_string()))
    }

    async fn get_order_status(
        &self,
        symbol: &str,
        order_id: u64,
    ) -> Result<OrderOutcome, GatewayError> {
        let response = retry_with_backoff(&self.retry, "get_order_status", move || async move {
            match self.client.query_order(symbol, order_id).await {
                Ok(r) => Ok(r),
                Err(e) => Err(self.lift("get_order_status", e, symbol).await),
            }
        })
        .await?;

        response
            .to_outcome()
            .map_err(|e| GatewayError::Unknown(e.to_string()))
    }

    async fn cancel_order(&self, symbol: &str, order_id: u64) -> Result<(), GatewayError> {
        retry_with_backoff(&self.retry, "cancel_order", move || async move {
            match self.client.cancel_order(symbol, order_id).await {
                Ok(_) => Ok(()),
                Err(e) => {
                    self.resync_on_drift(&e).await;
                    Err(e.classify_cancel(symbol, order_id))
                }
            }
        })
        .await
    }

    async fn get_current_price(&self, symbol: &str) -> Result<Decimal, GatewayError> {
        retry_with_backoff(&self.retry, "get_current_price", move || async move {
            match self.client.ticker_price(symbol).await {
                Ok(price) => Ok(price),
                Err(e) => Err(self.lift("get_current_price", e, symbol).await),
            }
        })
        .await
    }

    async fn get_available_balance(&self, asset: &str) -> Result<Decimal, GatewayError> {
        let entries = retry_with_backoff(&self.retry, "get_available_balance", move || async move {
            match self.client.balance().await {
                Ok(entries) => Ok(entries),
                Err(e) => Err(self.lift("get_available_balance", e, asset).await),
            }
        })
        .await?;

        Ok(entries
            .into_iter()
            .find(|entry| entry.asset == asset)
            .map_or(Decimal::ZERO, |entry| entry.available_balance))
    }
}
