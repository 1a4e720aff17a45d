//! Fetch-and-persist step shared by the resolver and the refresher.

use std::sync::Arc;

use chrono::NaiveDate;

use fx_types::{DateRange, ExchangeRate, PopulateReport, RateError, RatesRepository, today};

use super::selector::ProviderSelector;

/// Pulls a time series through the provider chain and appends it to the
/// rate store.
pub struct Populator<R: RatesRepository> {
    repo: Arc<R>,
    selector: ProviderSelector<R>,
}

impl<R: RatesRepository> Populator<R> {
    pub fn new(repo: Arc<R>, selector: ProviderSelector<R>) -> Self {
        Self { repo, selector }
    }

    /// Fetches rates from `source` to every other known currency over the
    /// whole `range` and inserts each (source, target, date) row that is not
    /// stored yet.
    ///
    /// Every returned target code is checked against the registry before
    /// anything is written.
    #[tracing::instrument(skip(self, range), fields(range = %range))]
    pub async fn populate(&self, source: &str, range: DateRange) -> Result<PopulateReport, RateError> {
        if !self.repo.currency_exists(source).await? {
            return Err(RateError::UnknownCurrency(source.to_string()));
        }

        let series = self
            .selector
            .fetch_timeseries(
                source,
                &range.start().to_string(),
                &range.end().to_string(),
            )
            .await?;

        let known = self.repo.all_codes().await?;
        if let Some(unknown) = series
            .values()
            .flat_map(|rates| rates.keys())
            .find(|code| !known.contains(*code))
        {
            return Err(RateError::UnknownCurrency(unknown.clone()));
        }

        let mut report = PopulateReport::default();
        for (date, rates) in &series {
            for (target, value) in rates {
                if target == source {
                    continue;
                }
                let row = ExchangeRate::new(source, target.as_str(), *date, *value);
                if self.repo.insert_rate_if_absent(&row).await? {
                    report.inserted += 1;
                } else {
                    report.skipped += 1;
                }
            }
        }

        tracing::info!(
            inserted = report.inserted,
            skipped = report.skipped,
            "Populated exchange rates"
        );
        Ok(report)
    }

    /// Populates from `start` up to today.
    pub async fn populate_until_today(
        &self,
        source: &str,
        start: NaiveDate,
    ) -> Result<PopulateReport, RateError> {
        let range = DateRange::new(start, today())?;
        self.populate(source, range).await
    }
}
