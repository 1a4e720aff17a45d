//! # FX Client SDK
//!
//! A typed Rust client for the exchange-rate API.

use fx_types::{
    ConversionResult, CreateCurrencyRequest, CreateProviderRequest, Currency, ProviderResponse,
    RateTable, RefreshReport, UpdateCurrencyRequest, UpdateProviderRequest,
};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Exchange-rate API client.
pub struct FxClient {
    base_url: String,
    api_key: Option<String>,
    http: Client,
}

impl FxClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            http: Client::new(),
        }
    }

    /// Sets the API key sent as a bearer token.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Checks if the API is healthy.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(resp.status().is_success())
    }

    /// Rates for `source` over `[date_from, date_to]` (`YYYY-MM-DD`).
    pub async fn rates(
        &self,
        source: &str,
        date_from: &str,
        date_to: &str,
    ) -> Result<RateTable, ClientError> {
        let req = self.http.get(self.url("/api/rates")).query(&[
            ("source_currency", source),
            ("date_from", date_from),
            ("date_to", date_to),
        ]);
        self.send(req).await
    }

    /// Converts `amount` of `source` at today's rates. An empty `targets`
    /// slice means every other known currency.
    pub async fn convert(
        &self,
        source: &str,
        targets: &[&str],
        amount: Option<f64>,
    ) -> Result<ConversionResult, ClientError> {
        let mut params = vec![("source_currency", source.to_string())];
        if !targets.is_empty() {
            params.push(("exchanged_currency", targets.join(",")));
        }
        if let Some(amount) = amount {
            params.push(("amount", amount.to_string()));
        }
        let req = self.http.get(self.url("/api/convert")).query(&params);
        self.send(req).await
    }

    /// Runs a full refresh sweep on the server and waits for its report.
    pub async fn refresh(&self) -> Result<RefreshReport, ClientError> {
        self.send(self.http.post(self.url("/api/refresh"))).await
    }

    /// Lists all currencies.
    pub async fn list_currencies(&self) -> Result<Vec<Currency>, ClientError> {
        self.send(self.http.get(self.url("/api/currencies"))).await
    }

    /// Registers a currency.
    pub async fn create_currency(
        &self,
        code: &str,
        name: &str,
        symbol: &str,
    ) -> Result<Currency, ClientError> {
        let req = CreateCurrencyRequest {
            code: code.to_string(),
            name: name.to_string(),
            symbol: symbol.to_string(),
        };
        self.send(self.http.post(self.url("/api/currencies")).json(&req))
            .await
    }

    /// Renames a currency or changes its symbol.
    pub async fn update_currency(
        &self,
        code: &str,
        req: &UpdateCurrencyRequest,
    ) -> Result<Currency, ClientError> {
        let path = format!("/api/currencies/{}", code);
        self.send(self.http.patch(self.url(&path)).json(req)).await
    }

    /// Lists provider credentials in failover order.
    pub async fn list_providers(&self) -> Result<Vec<ProviderResponse>, ClientError> {
        self.send(self.http.get(self.url("/api/providers"))).await
    }

    /// Registers a provider credential.
    pub async fn create_provider(
        &self,
        req: &CreateProviderRequest,
    ) -> Result<ProviderResponse, ClientError> {
        self.send(self.http.post(self.url("/api/providers")).json(req))
            .await
    }

    /// Updates a provider credential by id.
    pub async fn update_provider(
        &self,
        id: &str,
        req: &UpdateProviderRequest,
    ) -> Result<ProviderResponse, ClientError> {
        let path = format!("/api/providers/{}", id);
        self.send(self.http.patch(self.url(&path)).json(req)).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, mut req: RequestBuilder) -> Result<T, ClientError> {
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await?;
        self.handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            Ok(serde_json::from_str(&body)?)
        } else {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
                .unwrap_or(body);
            Err(ClientError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}
