//! # FX Hex
//!
//! Application service layer and HTTP adapter for the exchange-rate service.
//!
//! ## Architecture
//!
//! - `service/` - Rate resolution, provider failover, population, background
//!   refresh and conversion
//! - `inbound/` - HTTP adapter (Axum server)
//!
//! The service is generic over `R: RatesRepository`, allowing different
//! repository implementations to be injected, and takes its providers from a
//! `ProviderFactory`.

pub mod inbound;
pub mod openapi;
pub mod service;


pub use service::{RateService, ServiceConfig};
