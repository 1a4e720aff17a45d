//! # FX Types
//!
//! Domain types and port traits for the exchange-rate service.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (Currency, ExchangeRate, ProviderCredential)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for API boundaries
//! - `error/` - Domain, repository, rate and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    CredentialId, Currency, DateRange, ExchangeRate, PriorityLedger, ProviderCredential,
    RateTable, Timeseries, today,
};
pub use dto::*;
pub use error::{AppError, DomainError, RateError, RepoError};
pub use ports::{CredentialRegistry, CurrencyRegistry, RateProvider, RateStore, RatesRepository};
