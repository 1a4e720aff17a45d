//! Exchange-rate ledger entries and the maps built from them.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One stored rate: 1 unit of `source_currency` buys `rate_value` units of
/// `exchanged_currency` on `valuation_date`.
///
/// At most one row exists per (source, exchanged, date); rows are append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub source_currency: String,
    pub exchanged_currency: String,
    pub valuation_date: NaiveDate,
    pub rate_value: Decimal,
}

impl ExchangeRate {
    pub fn new(
        source_currency: impl Into<String>,
        exchanged_currency: impl Into<String>,
        valuation_date: NaiveDate,
        rate_value: Decimal,
    ) -> Self {
        Self {
            source_currency: source_currency.into(),
            exchanged_currency: exchanged_currency.into(),
            valuation_date,
            rate_value,
        }
    }
}

/// Provider output: date -> (target code -> rate).
pub type Timeseries = BTreeMap<NaiveDate, BTreeMap<String, Decimal>>;

/// Resolver output: date -> (target code -> rate as float).
pub type RateTable = BTreeMap<NaiveDate, BTreeMap<String, f64>>;
