//! Synthetic provider: random rates for offline environments.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

use fx_types::{RateError, RateProvider, Timeseries};

use crate::prepare_timeseries;

const BASE_RATE: f64 = 1.0;
const MAX_VARIANCE: f64 = 0.05;

/// Generates `BASE_RATE * (1 + u)` with `u` uniform in `[-5%, +5%]`,
/// rounded to 4 decimal places.
///
/// Output is deterministic only when built with [`SyntheticProvider::with_seed`].
pub struct SyntheticProvider {
    known_codes: BTreeSet<String>,
    rng: Mutex<StdRng>,
}

impl SyntheticProvider {
    pub fn new(known_codes: BTreeSet<String>) -> Self {
        Self {
            known_codes,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    pub fn with_seed(known_codes: BTreeSet<String>, seed: u64) -> Self {
        Self {
            known_codes,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn next_rate(&self) -> Result<Decimal, RateError> {
        let factor = {
            let mut rng = self
                .rng
                .lock()
                .map_err(|_| RateError::Provider("synthetic generator poisoned".into()))?;
            rng.random_range(-MAX_VARIANCE..=MAX_VARIANCE)
        };
        Decimal::from_f64_retain(BASE_RATE * (1.0 + factor))
            .map(|rate| rate.round_dp(4))
            .ok_or_else(|| RateError::Provider("synthetic rate out of range".into()))
    }
}

#[async_trait]
impl RateProvider for SyntheticProvider {
    async fn get_exchange_rate_data(
        &self,
        _source: &str,
        _target: &str,
        valuation_date: &str,
    ) -> Result<Decimal, RateError> {
        fx_types::domain::date_range::parse_date(valuation_date)?;
        self.next_rate()
    }

    async fn get_timeseries_rates(
        &self,
        source: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<Timeseries, RateError> {
        let req = prepare_timeseries(source, start_date, end_date, &self.known_codes)?;

        let mut series = Timeseries::new();
        for date in req.range.days() {
            let mut day = BTreeMap::new();
            for target in &req.targets {
                day.insert(target.clone(), self.next_rate()?);
            }
            series.insert(date, day);
        }
        Ok(series)
    }
}
