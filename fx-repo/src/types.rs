//! Database row types shared by the SQLite and PostgreSQL adapters.
//!
//! Rate values are always read back as text (`rate_value::TEXT` on Postgres,
//! native TEXT on SQLite) so one row type serves both backends.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use fx_types::{CredentialId, Currency, ExchangeRate, ProviderCredential, RepoError};

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

/// Currency row from database.
#[derive(FromRow)]
pub struct DbCurrency {
    pub code: String,
    pub name: String,
    pub symbol: String,
}

impl From<DbCurrency> for Currency {
    fn from(row: DbCurrency) -> Self {
        Currency {
            code: row.code,
            name: row.name,
            symbol: row.symbol,
        }
    }
}

/// Provider credential row from database.
#[derive(FromRow)]
pub struct DbCredential {
    pub id: Uuid,
    pub name: String,
    pub token: String,
    pub url: String,
    pub priority: i32,
    pub enabled: bool,
}

impl From<DbCredential> for ProviderCredential {
    fn from(row: DbCredential) -> Self {
        ProviderCredential {
            id: CredentialId::from_uuid(row.id),
            name: row.name,
            token: row.token,
            url: row.url,
            priority: row.priority,
            enabled: row.enabled,
        }
    }
}

/// Exchange rate row from database.
#[derive(FromRow)]
pub struct DbExchangeRate {
    pub source_currency: String,
    pub exchanged_currency: String,
    pub valuation_date: NaiveDate,
    pub rate_value: String,
}

impl DbExchangeRate {
    pub fn into_domain(self) -> Result<ExchangeRate, RepoError> {
        let rate_value = Decimal::from_str(self.rate_value.trim())
            .map_err(|e| RepoError::Database(format!("bad rate_value {:?}: {}", self.rate_value, e)))?;

        Ok(ExchangeRate {
            source_currency: self.source_currency,
            exchanged_currency: self.exchanged_currency,
            valuation_date: self.valuation_date,
            rate_value,
        })
    }
}

/// Maps a sqlx error, turning unique violations into `RepoError::Conflict`.
pub fn map_db_err(err: sqlx::Error, conflict: impl FnOnce() -> String) -> RepoError {
    match err.as_database_error() {
        Some(db) if db.is_unique_violation() => RepoError::Conflict(conflict()),
        _ => RepoError::Database(err.to_string()),
    }
}
