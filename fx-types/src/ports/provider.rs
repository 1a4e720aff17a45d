//! Exchange-rate provider port.
//!
//! Implementations are HTTP clients for real upstream APIs or synthetic
//! generators. Which one runs is decided by a credential's `name`.

use rust_decimal::Decimal;

use crate::domain::Timeseries;
use crate::error::RateError;

/// Port trait for external exchange-rate providers.
#[async_trait::async_trait]
pub trait RateProvider: Send + Sync {
    /// Rate for one `source -> target` pair on `valuation_date` (`YYYY-MM-DD`).
    ///
    /// Fails with [`RateError::Provider`] on upstream failure or a malformed
    /// response.
    async fn get_exchange_rate_data(
        &self,
        source: &str,
        target: &str,
        valuation_date: &str,
    ) -> Result<Decimal, RateError>;

    /// Rates from `source` to every other known currency, for every day in
    /// `[start_date, end_date]`.
    ///
    /// Fails with [`RateError::InvalidDateRange`] if either date does not
    /// parse or `start_date > end_date`, and with [`RateError::Provider`] on
    /// upstream failure or a response missing the expected structure.
    async fn get_timeseries_rates(
        &self,
        source: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<Timeseries, RateError>;
}
