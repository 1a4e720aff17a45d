//! SQLite repository adapter.
#![allow(clippy::collapsible_if)]

use std::collections::BTreeSet;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use fx_types::{
    CredentialId, CredentialRegistry, Currency, CurrencyRegistry, DateRange, ExchangeRate,
    ProviderCredential, RateStore, RepoError,
};

use crate::types::{DbCredential, DbCurrency, DbExchangeRate, map_db_err};

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite repository implementation.
pub struct SqliteRepo {
    pool: SqlitePool,
}

impl SqliteRepo {
    /// Creates a new SQLite repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let in_memory = database_url.contains(":memory:");

        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            // Remove query parameters
            let path = path.split('?').next().unwrap_or(path);
            if !in_memory {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // One connection keeps an in-memory database consistent across tasks.
        let max_connections = if in_memory { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let repo = Self { pool };
        repo.create_schema().await?;
        Ok(repo)
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the database schema (for testing with existing pool).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        let ddl = include_str!("../migrations/0001_create_tables.sql");
        sqlx::query(ddl)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(())
    }
}

/// `... WHERE source_currency = ? AND valuation_date BETWEEN ? AND ? AND exchanged_currency IN (...)`
fn push_rate_filter<'a>(
    qb: &mut QueryBuilder<'a, Sqlite>,
    source: &'a str,
    targets: &'a BTreeSet<String>,
    range: DateRange,
) {
    qb.push(" WHERE source_currency = ")
        .push_bind(source)
        .push(" AND valuation_date BETWEEN ")
        .push_bind(range.start())
        .push(" AND ")
        .push_bind(range.end())
        .push(" AND exchanged_currency IN (");
    let mut codes = qb.separated(", ");
    for code in targets {
        codes.push_bind(code.as_str());
    }
    codes.push_unseparated(")");
}

// ─────────────────────────────────────────────────────────────────────────────
// Currency registry
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl CurrencyRegistry for SqliteRepo {
    async fn create_currency(&self, currency: Currency) -> Result<Currency, RepoError> {
        sqlx::query(r#"INSERT INTO currencies (code, name, symbol) VALUES (?, ?, ?)"#)
            .bind(&currency.code)
            .bind(&currency.name)
            .bind(&currency.symbol)
            .execute(&self.pool)
            .await
            .map_err(|e| map_db_err(e, || format!("Currency {} already exists", currency.code)))?;

        Ok(currency)
    }

    async fn get_currency(&self, code: &str) -> Result<Option<Currency>, RepoError> {
        let row: Option<DbCurrency> =
            sqlx::query_as(r#"SELECT code, name, symbol FROM currencies WHERE code = ?"#)
                .bind(code)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(row.map(Currency::from))
    }

    async fn list_currencies(&self) -> Result<Vec<Currency>, RepoError> {
        let rows: Vec<DbCurrency> =
            sqlx::query_as(r#"SELECT code, name, symbol FROM currencies ORDER BY code"#)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(Currency::from).collect())
    }

    async fn update_currency(&self, currency: Currency) -> Result<Currency, RepoError> {
        let result = sqlx::query(r#"UPDATE currencies SET name = ?, symbol = ? WHERE code = ?"#)
            .bind(&currency.name)
            .bind(&currency.symbol)
            .bind(&currency.code)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(currency)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Credential registry
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl CredentialRegistry for SqliteRepo {
    async fn create_credential(
        &self,
        credential: ProviderCredential,
    ) -> Result<ProviderCredential, RepoError> {
        sqlx::query(
            r#"INSERT INTO provider_credentials (id, name, token, url, priority, enabled) VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(*credential.id.as_uuid())
        .bind(&credential.name)
        .bind(&credential.token)
        .bind(&credential.url)
        .bind(credential.priority)
        .bind(credential.enabled)
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_err(e, || format!("Provider {} already exists", credential.name)))?;

        Ok(credential)
    }

    async fn get_credential(
        &self,
        id: CredentialId,
    ) -> Result<Option<ProviderCredential>, RepoError> {
        let row: Option<DbCredential> = sqlx::query_as(
            r#"SELECT id, name, token, url, priority, enabled FROM provider_credentials WHERE id = ?"#,
        )
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(row.map(ProviderCredential::from))
    }

    async fn list_credentials(&self) -> Result<Vec<ProviderCredential>, RepoError> {
        // rowid keeps insertion order among equal priorities.
        let rows: Vec<DbCredential> = sqlx::query_as(
            r#"SELECT id, name, token, url, priority, enabled FROM provider_credentials ORDER BY priority, rowid"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(ProviderCredential::from).collect())
    }

    async fn save_priorities(&self, assignments: &[(CredentialId, i32)]) -> Result<(), RepoError> {
        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        for (id, priority) in assignments {
            sqlx::query(r#"UPDATE provider_credentials SET priority = ? WHERE id = ?"#)
                .bind(priority)
                .bind(*id.as_uuid())
                .execute(&mut *db_tx)
                .await
                .map_err(|e| RepoError::Database(e.to_string()))?;
        }

        db_tx
            .commit()
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        tracing::debug!(count = assignments.len(), "Saved provider priorities");
        Ok(())
    }

    async fn update_credential(
        &self,
        credential: ProviderCredential,
    ) -> Result<ProviderCredential, RepoError> {
        let result = sqlx::query(
            r#"UPDATE provider_credentials SET token = ?, url = ?, priority = ?, enabled = ? WHERE id = ?"#,
        )
        .bind(&credential.token)
        .bind(&credential.url)
        .bind(credential.priority)
        .bind(credential.enabled)
        .bind(*credential.id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        tracing::info!(
            provider = %credential.name,
            priority = credential.priority,
            enabled = credential.enabled,
            "Updated provider credential"
        );
        Ok(credential)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rate store
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl RateStore for SqliteRepo {
    async fn distinct_dates(
        &self,
        source: &str,
        targets: &BTreeSet<String>,
        range: DateRange,
    ) -> Result<BTreeSet<NaiveDate>, RepoError> {
        if targets.is_empty() {
            return Ok(BTreeSet::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT DISTINCT valuation_date FROM exchange_rates");
        push_rate_filter(&mut qb, source, targets, range);

        let dates: Vec<NaiveDate> = qb
            .build_query_scalar()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(dates.into_iter().collect())
    }

    async fn distinct_targets(
        &self,
        source: &str,
        targets: &BTreeSet<String>,
        range: DateRange,
    ) -> Result<BTreeSet<String>, RepoError> {
        if targets.is_empty() {
            return Ok(BTreeSet::new());
        }

        let mut qb =
            QueryBuilder::<Sqlite>::new("SELECT DISTINCT exchanged_currency FROM exchange_rates");
        push_rate_filter(&mut qb, source, targets, range);

        let codes: Vec<String> = qb
            .build_query_scalar()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(codes.into_iter().collect())
    }

    async fn list_rates(
        &self,
        source: &str,
        targets: &BTreeSet<String>,
        range: DateRange,
    ) -> Result<Vec<ExchangeRate>, RepoError> {
        if targets.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT source_currency, exchanged_currency, valuation_date, rate_value FROM exchange_rates",
        );
        push_rate_filter(&mut qb, source, targets, range);
        qb.push(" ORDER BY valuation_date, exchanged_currency");

        let rows: Vec<DbExchangeRate> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbExchangeRate::into_domain).collect()
    }

    async fn insert_rate_if_absent(&self, rate: &ExchangeRate) -> Result<bool, RepoError> {
        let result = sqlx::query(
            r#"INSERT INTO exchange_rates (source_currency, exchanged_currency, valuation_date, rate_value)
               VALUES (?, ?, ?, ?)
               ON CONFLICT (source_currency, exchanged_currency, valuation_date) DO NOTHING"#,
        )
        .bind(&rate.source_currency)
        .bind(&rate.exchanged_currency)
        .bind(rate.valuation_date)
        .bind(rate.rate_value.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        let inserted = result.rows_affected() == 1;
        if !inserted {
            tracing::trace!(
                source = %rate.source_currency,
                target = %rate.exchanged_currency,
                date = %rate.valuation_date,
                "Rate already stored"
            );
        }
        Ok(inserted)
    }

    async fn latest_valuation_date(&self, source: &str) -> Result<Option<NaiveDate>, RepoError> {
        sqlx::query_scalar(
            r#"SELECT valuation_date FROM exchange_rates WHERE source_currency = ? ORDER BY valuation_date DESC LIMIT 1"#,
        )
        .bind(source)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))
    }
}
