//! CurrencyBeacon-style HTTP adapter.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use governor::DefaultDirectRateLimiter;
use rust_decimal::Decimal;
use serde::Deserialize;

use fx_types::{RateError, RateProvider, Timeseries};

use crate::prepare_timeseries;

/// Envelope shared by the historical and timeseries endpoints:
/// `{"response": {"2025-01-01": {"EUR": 0.93}}}`.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    response: Option<BTreeMap<NaiveDate, BTreeMap<String, Decimal>>>,
}

/// Live provider backed by a CurrencyBeacon-compatible REST API.
pub struct LiveProvider {
    client: reqwest::Client,
    base_url: String,
    token: String,
    known_codes: BTreeSet<String>,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl LiveProvider {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        token: &str,
        known_codes: BTreeSet<String>,
        limiter: Arc<DefaultDirectRateLimiter>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            known_codes,
            limiter,
        }
    }

    async fn fetch(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<BTreeMap<NaiveDate, BTreeMap<String, Decimal>>, RateError> {
        self.limiter.until_ready().await;

        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "requesting upstream rates");

        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                RateError::Provider(format!("Failed to retrieve exchange rates from API: {}", e))
            })?;

        let envelope: Envelope = resp.json().await.map_err(|e| {
            RateError::Provider(format!("Malformed response from API: {}", e))
        })?;

        match envelope.response {
            Some(rates) if !rates.is_empty() => Ok(rates),
            _ => Err(RateError::Provider("Invalid response format from API".into())),
        }
    }
}

#[async_trait]
impl RateProvider for LiveProvider {
    #[tracing::instrument(skip(self))]
    async fn get_exchange_rate_data(
        &self,
        source: &str,
        target: &str,
        valuation_date: &str,
    ) -> Result<Decimal, RateError> {
        let date = fx_types::domain::date_range::parse_date(valuation_date)?;
        let source = source.trim().to_ascii_uppercase();
        let target = target.trim().to_ascii_uppercase();
        let date_str = date.to_string();

        let rates = self
            .fetch(
                "/v1/historical",
                &[
                    ("base", source.as_str()),
                    ("date", date_str.as_str()),
                    ("symbols", target.as_str()),
                ],
            )
            .await?;

        rates
            .get(&date)
            .and_then(|day| day.get(&target))
            .copied()
            .ok_or_else(|| {
                RateError::Provider(format!("No {} rate for {} in API response", target, date))
            })
    }

    #[tracing::instrument(skip(self))]
    async fn get_timeseries_rates(
        &self,
        source: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<Timeseries, RateError> {
        let req = prepare_timeseries(source, start_date, end_date, &self.known_codes)?;
        let symbols = req.targets.join(",");
        let start = req.range.start().to_string();
        let end = req.range.end().to_string();

        let rates = self
            .fetch(
                "/v1/timeseries",
                &[
                    ("base", req.source.as_str()),
                    ("symbols", symbols.as_str()),
                    ("start_date", start.as_str()),
                    ("end_date", end.as_str()),
                ],
            )
            .await?;

        Ok(rates
            .into_iter()
            .filter(|(date, _)| req.range.contains(*date))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::net::SocketAddr;
    use std::num::NonZeroU32;

    use axum::{
        Json, Router,
        extract::Query,
        http::{HeaderMap, StatusCode},
        response::IntoResponse,
        routing::get,
    };
    use governor::{Quota, RateLimiter};

    /// Serves `app` on an ephemeral local port.
    async fn spawn_stub(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn provider(addr: SocketAddr) -> LiveProvider {
        let known = ["USD", "EUR", "GBP"].into_iter().map(String::from).collect();
        let limiter = Arc::new(RateLimiter::direct(Quota::per_second(
            NonZeroU32::new(100).unwrap(),
        )));
        LiveProvider::new(
            reqwest::Client::new(),
            &format!("http://{}/", addr),
            "test-token",
            known,
            limiter,
        )
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            == Some("Bearer test-token")
    }

    async fn historical(
        headers: HeaderMap,
        Query(q): Query<HashMap<String, String>>,
    ) -> impl IntoResponse {
        if !authorized(&headers) {
            return (StatusCode::UNAUTHORIZED, Json(serde_json::json!({}))).into_response();
        }
        let body = serde_json::json!({
            "response": { q["date"].clone(): { q["symbols"].clone(): 0.85 } }
        });
        Json(body).into_response()
    }

    async fn timeseries(
        headers: HeaderMap,
        Query(q): Query<HashMap<String, String>>,
    ) -> impl IntoResponse {
        if !authorized(&headers) || q["base"] != "USD" || q["symbols"] != "EUR,GBP" {
            return (StatusCode::BAD_REQUEST, Json(serde_json::json!({}))).into_response();
        }
        Json(serde_json::json!({
            "response": {
                "2022-12-31": { "EUR": 0.5 },
                "2023-01-01": { "EUR": 0.93, "GBP": 0.8 },
                "2023-01-02": { "EUR": 0.94, "GBP": 0.81 }
            }
        }))
        .into_response()
    }

    #[tokio::test]
    async fn test_historical_rate_success() {
        let app = Router::new().route("/v1/historical", get(historical));
        let addr = spawn_stub(app).await;

        let rate = provider(addr)
            .get_exchange_rate_data("usd", "eur", "2023-01-01")
            .await
            .unwrap();

        assert_eq!(rate, Decimal::new(85, 2));
    }

    #[tokio::test]
    async fn test_timeseries_success_trims_to_range() {
        let app = Router::new().route("/v1/timeseries", get(timeseries));
        let addr = spawn_stub(app).await;

        let series = provider(addr)
            .get_timeseries_rates("USD", "2023-01-01", "2023-01-02")
            .await
            .unwrap();

        assert_eq!(series.len(), 2);
        let first = &series[&NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()];
        assert_eq!(first["EUR"], Decimal::new(93, 2));
        assert_eq!(first["GBP"], Decimal::new(8, 1));
    }

    #[tokio::test]
    async fn test_non_success_status_is_provider_error() {
        let app = Router::new().route(
            "/v1/timeseries",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let addr = spawn_stub(app).await;

        let err = provider(addr)
            .get_timeseries_rates("USD", "2023-01-01", "2023-01-03")
            .await
            .unwrap_err();

        assert!(
            matches!(err, RateError::Provider(msg) if msg.contains("Failed to retrieve exchange rates from API"))
        );
    }

    #[tokio::test]
    async fn test_missing_response_key_is_provider_error() {
        let app = Router::new().route(
            "/v1/timeseries",
            get(|| async { Json(serde_json::json!({ "wrong_key": "no_rates_here" })) }),
        );
        let addr = spawn_stub(app).await;

        let err = provider(addr)
            .get_timeseries_rates("USD", "2023-01-01", "2023-01-03")
            .await
            .unwrap_err();

        assert!(
            matches!(err, RateError::Provider(msg) if msg.contains("Invalid response format from API"))
        );
    }

    #[tokio::test]
    async fn test_invalid_range_fails_before_any_request() {
        // Nothing listens here; a request would surface as a provider error.
        let addr: SocketAddr = "127.0.0.1:9".parse().unwrap();

        let err = provider(addr)
            .get_timeseries_rates("USD", "2023-01-03", "2023-01-01")
            .await
            .unwrap_err();

        assert!(matches!(err, RateError::InvalidDateRange(_)));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_provider_error() {
        let addr: SocketAddr = "127.0.0.1:9".parse().unwrap();

        let err = provider(addr)
            .get_exchange_rate_data("USD", "EUR", "2023-01-01")
            .await
            .unwrap_err();

        assert!(matches!(err, RateError::Provider(_)));
    }
}
