use crate::error::RestError;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_RETRY_AFTER_MS: u64 = 60_000;

pub struct RestClient {
    client: Client,
    base_url: String,
}

impl RestClient {
    /// Create a client rooted at `base_url` (e.g. "https://fapi.binance.com").
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RestError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RestError::RequestBuild(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn with_default_timeout(base_url: &str) -> Result<Self, RestError> {
        Self::new(base_url, DEFAULT_TIMEOUT)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Option<&str>,
        headers: &[(&str, &str)],
    ) -> Result<T, RestError> {
        self.send(Method::GET, path, query, headers).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Option<&str>,
        headers: &[(&str, &str)],
    ) -> Result<T, RestError> {
        self.send(Method::POST, path, query, headers).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Option<&str>,
        headers: &[(&str, &str)],
    ) -> Result<T, RestError> {
        self.send(Method::DELETE, path, query, headers).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: Option<&str>,
        headers: &[(&str, &str)],
    ) -> Result<T, RestError> {
        let url = self.build_url(path, query);
        // Signed queries carry a signature; log the path only.
        tracing::debug!(method = %method, path = %path, "HTTP request");

        let mut request = self.client.request(method, &url);
        for (key, value) in headers {
            request = request.header(*key, *value);
        }

        let response = request.send().await?;
        Self::handle_response(response).await
    }

    fn build_url(&self, path: &str, query: Option<&str>) -> String {
        match query {
            Some(q) if !q.is_empty() => format!("{}{}?{}", self.base_url, path, q),
            _ => format!("{}{}", self.base_url, path),
        }
    }

    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, RestError> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            return serde_json::from_str(&body).map_err(|e| {
                tracing::warn!(body = %body, error = %e, "Failed to parse response");
                RestError::Parse(e.to_string())
            });
        }

        let status = status.as_u16();
        if status == 429 || status == 418 {
            let retry_after_ms = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after_ms)
                .unwrap_or(DEFAULT_RETRY_AFTER_MS);
            return Err(RestError::RateLimited {
                status,
                retry_after_ms,
            });
        }

        let body = response.text().await.unwrap_or_default();
        Err(RestError::HttpError { status, body })
    }
}

/// `Retry-After` in its delay-seconds form.
fn parse_retry_after_ms(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok().map(|secs| secs * 1_000)
}
