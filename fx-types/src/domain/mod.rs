//! Domain models for the exchange-rate service.

pub mod credential;
pub mod currency;
pub mod date_range;
pub mod rate;

pub use credential::{CredentialId, PriorityLedger, ProviderCredential};
pub use currency::Currency;
pub use date_range::{DateRange, today};
pub use rate::{ExchangeRate, RateTable, Timeseries};
