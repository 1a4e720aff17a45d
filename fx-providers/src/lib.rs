//! Exchange-rate provider adapters.
//!
//! Two adapters implement the [`RateProvider`] port:
//! - [`LiveProvider`] - CurrencyBeacon-style HTTP API, bearer-token authenticated
//! - [`SyntheticProvider`] - random rates around 1.0, for environments without network access
//!
//! Which adapter a credential gets is decided by its `name` (see [`ProviderKind`]);
//! the [`ProviderFactory`] does the construction so the selector can be tested
//! with scripted providers.
//!
//! # Example
//! ```no_run
//! use std::collections::BTreeSet;
//! use fx_providers::{DefaultProviderFactory, ProviderFactory, ProviderKind};
//! use fx_types::ProviderCredential;
//!
//! # async fn run() -> Result<(), fx_types::RateError> {
//! let credential = ProviderCredential::new("Mock", "", "", 0, true).unwrap();
//! let known: BTreeSet<String> = ["USD", "EUR"].into_iter().map(String::from).collect();
//!
//! let factory = DefaultProviderFactory::default();
//! let provider = factory.build(ProviderKind::Synthetic, &credential, &known)?;
//! let series = provider.get_timeseries_rates("USD", "2025-01-01", "2025-01-03").await?;
//! assert_eq!(series.len(), 3);
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeSet;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

use fx_types::{DateRange, ProviderCredential, RateError, RateProvider};

mod live;
mod synthetic;

pub use live::LiveProvider;
pub use synthetic::SyntheticProvider;

// ─────────────────────────────────────────────────────────────────────────────
// Provider kinds
// ─────────────────────────────────────────────────────────────────────────────

/// Adapter implementations a credential can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Live,
    Synthetic,
}

impl ProviderKind {
    /// Live adapters get a one-day smoke test before they are handed out.
    pub fn requires_health_check(&self) -> bool {
        matches!(self, ProviderKind::Live)
    }
}

impl FromStr for ProviderKind {
    type Err = RateError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "currencybeacon" | "live" => Ok(ProviderKind::Live),
            "mock" | "synthetic" => Ok(ProviderKind::Synthetic),
            _ => Err(RateError::Provider(format!("Unknown provider adapter: {}", name))),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared preprocessing
// ─────────────────────────────────────────────────────────────────────────────

/// A validated time-series request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeseriesRequest {
    pub source: String,
    pub range: DateRange,
    /// Every known currency except the source
    pub targets: Vec<String>,
}

/// Validates the date range and derives the implicit target set.
///
/// Callers never pass target currencies for time-series fetches: the targets
/// are always every known currency other than `source`.
pub fn prepare_timeseries(
    source: &str,
    start_date: &str,
    end_date: &str,
    known_codes: &BTreeSet<String>,
) -> Result<TimeseriesRequest, RateError> {
    let range = DateRange::parse(start_date, end_date)?;
    let source = source.trim().to_ascii_uppercase();
    let targets = known_codes
        .iter()
        .filter(|code| **code != source)
        .cloned()
        .collect();

    Ok(TimeseriesRequest {
        source,
        range,
        targets,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Factory
// ─────────────────────────────────────────────────────────────────────────────

/// Builds an adapter for a credential.
///
/// `known_codes` is a snapshot of the currency registry taken by the caller;
/// adapters use it as the implicit target set.
pub trait ProviderFactory: Send + Sync + 'static {
    fn build(
        &self,
        kind: ProviderKind,
        credential: &ProviderCredential,
        known_codes: &BTreeSet<String>,
    ) -> Result<Arc<dyn RateProvider>, RateError>;
}

/// Production factory: one shared HTTP client and outbound rate limiter for
/// every live adapter it builds.
pub struct DefaultProviderFactory {
    client: reqwest::Client,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl Default for DefaultProviderFactory {
    fn default() -> Self {
        Self::new(60, Duration::from_secs(10))
    }
}

impl DefaultProviderFactory {
    /// # Arguments
    /// * `requests_per_minute` - outbound quota shared by all live adapters
    /// * `timeout` - per-request timeout
    pub fn new(requests_per_minute: u32, timeout: Duration) -> Self {
        let burst = NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            limiter: Arc::new(RateLimiter::direct(Quota::per_minute(burst))),
        }
    }
}

impl ProviderFactory for DefaultProviderFactory {
    fn build(
        &self,
        kind: ProviderKind,
        credential: &ProviderCredential,
        known_codes: &BTreeSet<String>,
    ) -> Result<Arc<dyn RateProvider>, RateError> {
        match kind {
            ProviderKind::Live => {
                if credential.url.trim().is_empty() {
                    return Err(RateError::Provider(format!(
                        "Provider {} has no base URL",
                        credential.name
                    )));
                }
                Ok(Arc::new(LiveProvider::new(
                    self.client.clone(),
                    &credential.url,
                    &credential.token,
                    known_codes.clone(),
                    self.limiter.clone(),
                )))
            }
            ProviderKind::Synthetic => Ok(Arc::new(SyntheticProvider::new(known_codes.clone()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known() -> BTreeSet<String> {
        ["USD", "EUR", "GBP"].into_iter().map(String::from).collect()
    }

    #[test]
    fn test_kind_from_credential_name() {
        assert_eq!("CurrencyBeacon".parse::<ProviderKind>().unwrap(), ProviderKind::Live);
        assert_eq!("Mock".parse::<ProviderKind>().unwrap(), ProviderKind::Synthetic);
        assert_eq!(" synthetic ".parse::<ProviderKind>().unwrap(), ProviderKind::Synthetic);
        assert!(matches!(
            "Fixer".parse::<ProviderKind>(),
            Err(RateError::Provider(_))
        ));
    }

    #[test]
    fn test_only_live_requires_health_check() {
        assert!(ProviderKind::Live.requires_health_check());
        assert!(!ProviderKind::Synthetic.requires_health_check());
    }

    #[test]
    fn test_prepare_excludes_source_from_targets() {
        let req = prepare_timeseries("usd", "2025-01-01", "2025-01-02", &known()).unwrap();
        assert_eq!(req.source, "USD");
        assert_eq!(req.targets, vec!["EUR".to_string(), "GBP".to_string()]);
        assert_eq!(req.range.days().len(), 2);
    }

    #[test]
    fn test_prepare_rejects_bad_ranges() {
        assert!(matches!(
            prepare_timeseries("USD", "2023-01-03", "2023-01-01", &known()),
            Err(RateError::InvalidDateRange(_))
        ));
        assert!(matches!(
            prepare_timeseries("USD", "2023-13-01", "2023-01-03", &known()),
            Err(RateError::InvalidDateRange(_))
        ));
    }

    #[test]
    fn test_factory_rejects_live_without_url() {
        let factory = DefaultProviderFactory::default();
        let credential = ProviderCredential::new("CurrencyBeacon", "t", "", 0, true).unwrap();
        assert!(matches!(
            factory.build(ProviderKind::Live, &credential, &known()),
            Err(RateError::Provider(_))
        ));
    }
}
