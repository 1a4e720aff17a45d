//! Cache-first rate resolution.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;

use fx_types::{Currency, DateRange, RateError, RateTable, RatesRepository};

use super::populate::Populator;
use super::refresher::BackgroundRefresher;

/// A validated lookup: the source exists and the implicit target set is fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateRequest {
    pub source: String,
    pub range: DateRange,
    /// Every date in the range
    pub dates: BTreeSet<NaiveDate>,
    /// Every known currency except the source
    pub targets: BTreeSet<String>,
}

/// Answers rate lookups from the store, populating gaps through the
/// provider chain until the cache covers the request.
pub struct RateResolver<R: RatesRepository> {
    repo: Arc<R>,
    populator: Arc<Populator<R>>,
    maintenance: Option<Arc<BackgroundRefresher<R>>>,
    max_attempts: u32,
}

impl<R: RatesRepository> RateResolver<R> {
    /// # Arguments
    /// * `maintenance` - sweep scheduled after every resolution, if any
    /// * `max_attempts` - populate passes allowed before giving up
    pub fn new(
        repo: Arc<R>,
        populator: Arc<Populator<R>>,
        maintenance: Option<Arc<BackgroundRefresher<R>>>,
        max_attempts: u32,
    ) -> Self {
        Self {
            repo,
            populator,
            maintenance,
            max_attempts,
        }
    }

    /// Builds a request for `source` over `range`.
    ///
    /// Fails with [`RateError::UnknownCurrency`] if `source` is not registered.
    pub async fn prepare(&self, source: &str, range: DateRange) -> Result<RateRequest, RateError> {
        let source = Currency::normalize_code(source)
            .map_err(|_| RateError::UnknownCurrency(source.to_string()))?;

        let mut targets = self.repo.all_codes().await?;
        if !targets.remove(&source) {
            return Err(RateError::UnknownCurrency(source));
        }

        Ok(RateRequest {
            source,
            range,
            dates: range.days().into_iter().collect(),
            targets,
        })
    }

    /// Returns date -> (target -> rate) for the request.
    ///
    /// The completeness check is coarse: every date needs at least one row
    /// and every target needs at least one row, checked independently. A
    /// date x target cell can still be missing when both checks pass.
    #[tracing::instrument(skip(self, request), fields(source = %request.source, range = %request.range))]
    pub async fn resolve(&self, request: &RateRequest) -> Result<RateTable, RateError> {
        let table = self.resolve_inner(request).await?;

        if let Some(maintenance) = &self.maintenance {
            maintenance.trigger();
        }
        Ok(table)
    }

    async fn resolve_inner(&self, request: &RateRequest) -> Result<RateTable, RateError> {
        if request.targets.is_empty() {
            return Ok(request
                .dates
                .iter()
                .map(|date| (*date, BTreeMap::new()))
                .collect());
        }

        let mut attempts = 0;
        loop {
            if self.is_complete(request).await? {
                return self.load(request).await;
            }

            if attempts >= self.max_attempts {
                tracing::error!(attempts, "Cache still incomplete after populating");
                return Err(RateError::StalledResolution { attempts });
            }

            attempts += 1;
            tracing::debug!(attempt = attempts, "Cache miss, populating full range");
            self.populator
                .populate(&request.source, request.range)
                .await?;
        }
    }

    async fn is_complete(&self, request: &RateRequest) -> Result<bool, RateError> {
        let dates = self
            .repo
            .distinct_dates(&request.source, &request.targets, request.range)
            .await?;
        if dates != request.dates {
            return Ok(false);
        }

        let targets = self
            .repo
            .distinct_targets(&request.source, &request.targets, request.range)
            .await?;
        Ok(targets == request.targets)
    }

    async fn load(&self, request: &RateRequest) -> Result<RateTable, RateError> {
        let rows = self
            .repo
            .list_rates(&request.source, &request.targets, request.range)
            .await?;

        let mut table = RateTable::new();
        for row in rows {
            if let Some(value) = row.rate_value.to_f64() {
                table
                    .entry(row.valuation_date)
                    .or_default()
                    .insert(row.exchanged_currency, value);
            }
        }
        Ok(table)
    }
}
