use crate::error::BinanceFuturesError;
use crate::responses::{
    BalanceEntry, ExchangeInfoResponse, OrderResponse, ServerTimeResponse, TickerPriceResponse,
};
use auth::{ApiCredentials, RequestSigner};
use common::BinanceEnvironment;
use execution_core::OrderRequest;
use rest_client::RestClient;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

const API_KEY_HEADER: &str = "X-MBX-APIKEY";

/// Signed REST client for the USDⓈ-M futures API.
pub struct BinanceFuturesClient {
    client: RestClient,
    credentials: ApiCredentials,
    environment: BinanceEnvironment,
    recv_window_ms: u64,
    /// Local clock minus server clock.
    time_offset_ms: AtomicI64,
}

impl BinanceFuturesClient {
    pub fn new(
        credentials: ApiCredentials,
        environment: BinanceEnvironment,
        recv_window_ms: u64,
        timeout: Duration,
    ) -> Result<Self, BinanceFuturesError> {
        let client = RestClient::new(environment.rest_base_url(), timeout)?;

        Ok(Self {
            client,
            credentials,
            environment,
            recv_window_ms,
            time_offset_ms: AtomicI64::new(0),
        })
    }

    pub fn environment(&self) -> BinanceEnvironment {
        self.environment
    }

    /// Estimated exchange time, from the local clock and the last measured offset.
    pub fn server_timestamp_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis() - self.time_offset_ms.load(Ordering::Relaxed)
    }

    // ========================================================================
    // Time Synchronization
    // ========================================================================

    /// Measure the offset between the local clock and the exchange clock.
    ///
    /// Call on startup and whenever a request is rejected for timestamp drift.
    pub async fn sync_time(&self) -> Result<(), BinanceFuturesError> {
        let before = std::time::Instant::now();
        let response: ServerTimeResponse = self.public_get("/fapi/v1/time", None).await?;
        let rtt = before.elapsed().as_millis() as i64;

        let local_time = chrono::Utc::now().timestamp_millis();
        let offset = local_time - (response.server_time + rtt / 2);
        self.time_offset_ms.store(offset, Ordering::Relaxed);

        tracing::info!(
            server_time = response.server_time,
            offset_ms = offset,
            rtt_ms = rtt,
            "Time synchronized with futures server"
        );
        Ok(())
    }

    // ========================================================================
    // Market Data
    // ========================================================================

    /// GET /fapi/v1/exchangeInfo
    pub async fn exchange_info(&self) -> Result<ExchangeInfoResponse, BinanceFuturesError> {
        self.public_get("/fapi/v1/exchangeInfo", None).await
    }

    /// GET /fapi/v1/ticker/price
    pub async fn ticker_price(&self, symbol: &str) -> Result<Decimal, BinanceFuturesError> {
        let query = format!("symbol={}", symbol);
        let response: TickerPriceResponse = self
            .public_get("/fapi/v1/ticker/price", Some(&query))
            .await?;
        Ok(response.price)
    }

    // ========================================================================
    // Order Management
    // ========================================================================

    /// POST /fapi/v1/order
    ///
    /// Uses `newOrderRespType=RESULT` so market orders come back with their fill.
    pub async fn place_order(
        &self,
        request: &OrderRequest,
        client_order_id: &str,
    ) -> Result<OrderResponse, BinanceFuturesError> {
        let mut params: Vec<(&str, String)> = vec![
            ("symbol", request.symbol.clone()),
            ("side", request.side.as_binance_str().to_string()),
            ("type", request.kind.as_binance_str().to_string()),
            ("quantity", request.quantity.normalize().to_string()),
        ];
        if let Some(price) = request.price {
            params.push(("price", price.normalize().to_string()));
        }
        if let Some(stop) = request.stop_price {
            params.push(("stopPrice", stop.normalize().to_string()));
        }
        if let Some(tif) = request.time_in_force {
            params.push(("timeInForce", tif.as_binance_str().to_string()));
        }
        params.push(("newClientOrderId", client_order_id.to_string()));
        params.push(("newOrderRespType", "RESULT".to_string()));

        tracing::info!(
            symbol = %request.symbol,
            side = %request.side,
            kind = request.kind.as_binance_str(),
            quantity = %request.quantity,
            price = ?request.price,
            stop_price = ?request.stop_price,
            client_order_id = %client_order_id,
            "Placing order"
        );

        let response: OrderResponse = self.signed_post("/fapi/v1/order", &params).await?;

        tracing::info!(
            order_id = response.order_id,
            status = %response.status,
            executed_qty = %response.executed_qty,
            "Order placed"
        );
        Ok(response)
    }

    /// GET /fapi/v1/order
    pub async fn query_order(
        &self,
        symbol: &str,
        order_id: u64,
    ) -> Result<OrderResponse, BinanceFuturesError> {
        let params = [
            ("symbol", symbol.to_string()),
            ("orderId", order_id.to_string()),
        ];
        self.signed_get("/fapi/v1/order", &params).await
    }

    /// DELETE /fapi/v1/order
    pub async fn cancel_order(
        &self,
        symbol: &str,
        order_id: u64,
    ) -> Result<OrderResponse, BinanceFuturesError> {
        let params = [
            ("symbol", symbol.to_string()),
            ("orderId", order_id.to_string()),
        ];

        tracing::info!(symbol = %symbol, order_id, "Canceling order");
        let response: OrderResponse = self.signed_delete("/fapi/v1/order", &params).await?;
        tracing::info!(order_id = response.order_id, status = %response.status, "Order canceled");
        Ok(response)
    }

    /// GET /fapi/v2/balance
    pub async fn balance(&self) -> Result<Vec<BalanceEntry>, BinanceFuturesError> {
        self.signed_get("/fapi/v2/balance", &[]).await
    }

    // ========================================================================
    // Transport
    // ========================================================================

    async fn public_get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Option<&str>,
    ) -> Result<T, BinanceFuturesError> {
        self.client
            .get(path, query, &[])
            .await
            .map_err(BinanceFuturesError::from_rest)
    }

    fn signed_query(&self, params: &[(&str, String)]) -> String {
        RequestSigner::new(&self.credentials).signed_query(
            params,
            self.server_timestamp_ms(),
            self.recv_window_ms,
        )
    }

    async fn signed_get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, BinanceFuturesError> {
        let query = self.signed_query(params);
        let headers = [(API_KEY_HEADER, self.credentials.api_key())];
        self.client
            .get(path, Some(&query), &headers)
            .await
            .map_err(BinanceFuturesError::from_rest)
    }

    async fn signed_post<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, BinanceFuturesError> {
        let query = self.signed_query(params);
        let headers = [(API_KEY_HEADER, self.credentials.api_key())];
        self.client
            .post(path, Some(&query), &headers)
            .await
            .map_err(BinanceFuturesError::from_rest)
    }

    async fn signed_delete<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, BinanceFuturesError> {
        let query = self.signed_query(params);
        let headers = [(API_KEY_HEADER, self.credentials.api_key())];
        self.client
            .delete(path, Some(&query), &headers)
            .await
            .map_err(BinanceFuturesError::from_rest)
    }
}

impl std::fmt::Debug for BinanceFuturesClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceFuturesClient")
            .field("environment", &self.environment)
            .field("base_url", &self.client.base_url())
            .field("credentials", &self.credentials)
            .field("recv_window_ms", &self.recv_window_ms)
            .field(
                "time_offset_ms",
                &self.time_offset_ms.load(Ordering::Relaxed),
            )
            .finish()
    }
}
