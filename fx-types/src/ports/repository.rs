//! Repository port traits.
//!
//! Adapters (Postgres, SQLite, in-memory test doubles) implement these.

use chrono::NaiveDate;
use std::collections::BTreeSet;

use crate::domain::{CredentialId, Currency, DateRange, ExchangeRate, ProviderCredential};
use crate::error::RepoError;

/// Registry of known currencies.
#[async_trait::async_trait]
pub trait CurrencyRegistry: Send + Sync + 'static {
    async fn create_currency(&self, currency: Currency) -> Result<Currency, RepoError>;

    async fn get_currency(&self, code: &str) -> Result<Option<Currency>, RepoError>;

    /// All currencies ordered by code.
    async fn list_currencies(&self) -> Result<Vec<Currency>, RepoError>;

    /// Rewrites the name and symbol of the currency with `currency.code`.
    /// Fails with [`RepoError::NotFound`] if no such code is registered.
    async fn update_currency(&self, currency: Currency) -> Result<Currency, RepoError>;

    async fn currency_exists(&self, code: &str) -> Result<bool, RepoError> {
        Ok(self.get_currency(code).await?.is_some())
    }

    async fn all_codes(&self) -> Result<BTreeSet<String>, RepoError> {
        Ok(self
            .list_currencies()
            .await?
            .into_iter()
            .map(|c| c.code)
            .collect())
    }
}

/// Registry of provider credentials.
#[async_trait::async_trait]
pub trait CredentialRegistry: Send + Sync + 'static {
    async fn create_credential(
        &self,
        credential: ProviderCredential,
    ) -> Result<ProviderCredential, RepoError>;

    async fn get_credential(&self, id: CredentialId) -> Result<Option<ProviderCredential>, RepoError>;

    /// Every credential, enabled or not, ordered by ascending priority.
    async fn list_credentials(&self) -> Result<Vec<ProviderCredential>, RepoError>;

    /// Rewrites token, url, priority and enabled flag of `credential.id`.
    /// The name is fixed at creation. Fails with [`RepoError::NotFound`] for
    /// an unknown id.
    async fn update_credential(
        &self,
        credential: ProviderCredential,
    ) -> Result<ProviderCredential, RepoError>;

    /// Persists a full priority reassignment. MUST be atomic.
    async fn save_priorities(&self, assignments: &[(CredentialId, i32)]) -> Result<(), RepoError>;
}

/// Append-only, date-indexed ledger of exchange rates.
#[async_trait::async_trait]
pub trait RateStore: Send + Sync + 'static {
    /// Distinct valuation dates with at least one row for `source` against
    /// any of `targets` inside `range`.
    async fn distinct_dates(
        &self,
        source: &str,
        targets: &BTreeSet<String>,
        range: DateRange,
    ) -> Result<BTreeSet<NaiveDate>, RepoError>;

    /// Distinct target codes with at least one row for `source` inside `range`,
    /// restricted to `targets`.
    async fn distinct_targets(
        &self,
        source: &str,
        targets: &BTreeSet<String>,
        range: DateRange,
    ) -> Result<BTreeSet<String>, RepoError>;

    /// Matching rows ordered by valuation date.
    async fn list_rates(
        &self,
        source: &str,
        targets: &BTreeSet<String>,
        range: DateRange,
    ) -> Result<Vec<ExchangeRate>, RepoError>;

    /// Inserts the row unless one already exists for its
    /// (source, target, date) triple. Returns whether a row was written.
    async fn insert_rate_if_absent(&self, rate: &ExchangeRate) -> Result<bool, RepoError>;

    /// Most recent valuation date stored for `source`, if any.
    async fn latest_valuation_date(&self, source: &str) -> Result<Option<NaiveDate>, RepoError>;
}

/// Everything the application service needs from storage.
pub trait RatesRepository: CurrencyRegistry + CredentialRegistry + RateStore {}

impl<T> RatesRepository for T where T: CurrencyRegistry + CredentialRegistry + RateStore {}
