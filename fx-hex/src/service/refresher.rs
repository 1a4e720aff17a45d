//! Best-effort background maintenance: keep every currency's cache current.

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use dashmap::DashSet;
use tokio::task::JoinSet;

use fx_types::{RateError, RatesRepository, RefreshOutcome, RefreshReport, today};

use super::populate::Populator;

/// Brings the newest cached date of every known currency up to today.
///
/// Each currency is refreshed in its own task. A failure in one currency is
/// logged and recorded in the report; it never affects the others or the
/// caller. A currency already being refreshed is skipped.
pub struct BackgroundRefresher<R: RatesRepository> {
    repo: Arc<R>,
    populator: Arc<Populator<R>>,
    lookback_days: u64,
    in_flight: Arc<DashSet<String>>,
}

enum SweepItem {
    UpToDate(String),
    Refreshed(RefreshOutcome),
}

/// Releases a currency's in-flight slot when its refresh task ends.
struct InFlightGuard {
    set: Arc<DashSet<String>>,
    code: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.remove(&self.code);
    }
}

impl<R: RatesRepository> BackgroundRefresher<R> {
    /// # Arguments
    /// * `lookback_days` - how far back to start for a currency with no cached rates
    pub fn new(repo: Arc<R>, populator: Arc<Populator<R>>, lookback_days: u64) -> Self {
        Self {
            repo,
            populator,
            lookback_days,
            in_flight: Arc::new(DashSet::new()),
        }
    }

    /// Schedules a sweep and returns immediately. Nothing is surfaced to the
    /// caller; failures are only logged.
    pub fn trigger(self: &Arc<Self>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            match this.run_sweep().await {
                Ok(report) => tracing::debug!(
                    refreshed = report.refreshed.len(),
                    up_to_date = report.up_to_date.len(),
                    in_flight = report.in_flight.len(),
                    "Background refresh finished"
                ),
                Err(e) => tracing::warn!(error = %e, "Background refresh could not start"),
            }
        });
    }

    /// Runs one sweep over all known currencies and waits for every
    /// per-currency task.
    ///
    /// Only a failure to list currencies is an error; per-currency failures
    /// end up in [`RefreshOutcome::error`].
    #[tracing::instrument(skip(self))]
    pub async fn run_sweep(self: &Arc<Self>) -> Result<RefreshReport, RateError> {
        let today = today();
        let codes = self.repo.all_codes().await?;

        let mut report = RefreshReport::default();
        let mut tasks = JoinSet::new();

        for code in codes {
            if !self.in_flight.insert(code.clone()) {
                report.in_flight.push(code);
                continue;
            }
            let guard = InFlightGuard {
                set: Arc::clone(&self.in_flight),
                code: code.clone(),
            };
            let this = Arc::clone(self);
            tasks.spawn(async move {
                let _guard = guard;
                this.refresh_currency(code, today).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(SweepItem::UpToDate(code)) => report.up_to_date.push(code),
                Ok(SweepItem::Refreshed(outcome)) => report.refreshed.push(outcome),
                Err(e) => tracing::warn!(error = %e, "Refresh task aborted"),
            }
        }

        report.up_to_date.sort();
        report.refreshed.sort_by(|a, b| a.currency.cmp(&b.currency));
        Ok(report)
    }

    async fn refresh_currency(&self, code: String, today: NaiveDate) -> SweepItem {
        let from = match self.repo.latest_valuation_date(&code).await {
            Ok(Some(latest)) => latest,
            Ok(None) => today
                .checked_sub_days(Days::new(self.lookback_days))
                .unwrap_or(today),
            Err(e) => {
                tracing::warn!(currency = %code, error = %e, "Could not read latest cached date");
                return SweepItem::Refreshed(RefreshOutcome {
                    currency: code,
                    from: today,
                    populated: None,
                    error: Some(e.to_string()),
                });
            }
        };

        if from >= today {
            return SweepItem::UpToDate(code);
        }

        let result = self.populator.populate_until_today(&code, from).await;
        if let Err(e) = &result {
            tracing::warn!(currency = %code, error = %e, "Background refresh failed");
        }

        SweepItem::Refreshed(RefreshOutcome {
            currency: code,
            from,
            populated: result.as_ref().ok().copied(),
            error: result.err().map(|e| e.to_string()),
        })
    }
}
