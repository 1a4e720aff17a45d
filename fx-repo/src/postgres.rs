//! PostgreSQL repository adapter.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, QueryBuilder};

use fx_types::{
    CredentialId, CredentialRegistry, Currency, CurrencyRegistry, DateRange, ExchangeRate,
    ProviderCredential, RateStore, RepoError,
};

use crate::types::{DbCredential, DbCurrency, DbExchangeRate, map_db_err};

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL Repository
// ─────────────────────────────────────────────────────────────────────────────

/// PostgreSQL repository; uniqueness of rate triples is enforced by a table constraint.
pub struct PostgresRepo {
    pool: PgPool,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &PgPool, sql: &str, name: &str) -> Result<(), anyhow::Error> {
    for statement in sql.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration {} failed: {}", name, e))?;
        }
    }
    Ok(())
}

/// Runs all database migrations.
async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    execute_migration(
        pool,
        include_str!("../migrations/0001_create_tables_pg.sql"),
        "0001",
    )
    .await
}

impl PostgresRepo {
    /// Creates a new PostgreSQL repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the database schema (for testing with existing pool).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        run_migrations(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))
    }
}

fn push_rate_filter<'a>(
    qb: &mut QueryBuilder<'a, Postgres>,
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
impl CurrencyRegistry for PostgresRepo {
    async fn create_currency(&self, currency: Currency) -> Result<Currency, RepoError> {
        sqlx::query(r#"INSERT INTO currencies (code, name, symbol) VALUES ($1, $2, $3)"#)
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
            sqlx::query_as(r#"SELECT code, name, symbol FROM currencies WHERE code = $1"#)
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
        let result =
            sqlx::query(r#"UPDATE currencies SET name = $1, symbol = $2 WHERE code = $3"#)
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
impl CredentialRegistry for PostgresRepo {
    async fn create_credential(
        &self,
        credential: ProviderCredential,
    ) -> Result<ProviderCredential, RepoError> {
        sqlx::query(
            r#"INSERT INTO provider_credentials (id, name, token, url, priority, enabled) VALUES ($1, $2, $3, $4, $5, $6)"#,
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
            r#"SELECT id, name, token, url, priority, enabled FROM provider_credentials WHERE id = $1"#,
        )
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(row.map(ProviderCredential::from))
    }

    async fn list_credentials(&self) -> Result<Vec<ProviderCredential>, RepoError> {
        let rows: Vec<DbCredential> = sqlx::query_as(
            r#"SELECT id, name, token, url, priority, enabled FROM provider_credentials ORDER BY priority, name"#,
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

        // Lock the whole chain so concurrent re-linearisations serialise.
        sqlx::query(r#"SELECT id FROM provider_credentials FOR UPDATE"#)
            .execute(&mut *db_tx)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        for (id, priority) in assignments {
            sqlx::query(r#"UPDATE provider_credentials SET priority = $1 WHERE id = $2"#)
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
            r#"UPDATE provider_credentials SET token = $1, url = $2, priority = $3, enabled = $4 WHERE id = $5"#,
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
impl RateStore for PostgresRepo {
    async fn distinct_dates(
        &self,
        source: &str,
        targets: &BTreeSet<String>,
        range: DateRange,
    ) -> Result<BTreeSet<NaiveDate>, RepoError> {
        if targets.is_empty() {
            return Ok(BTreeSet::new());
        }

        let mut qb =
            QueryBuilder::<Postgres>::new("SELECT DISTINCT valuation_date FROM exchange_rates");
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
            QueryBuilder::<Postgres>::new("SELECT DISTINCT exchanged_currency FROM exchange_rates");
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

        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT source_currency, exchanged_currency, valuation_date, rate_value::TEXT AS rate_value FROM exchange_rates",
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
               VALUES ($1, $2, $3, $4)
               ON CONFLICT ON CONSTRAINT uq_exchange_rates_triple DO NOTHING"#,
        )
        .bind(&rate.source_currency)
        .bind(&rate.exchanged_currency)
        .bind(rate.valuation_date)
        .bind(rate.rate_value)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn latest_valuation_date(&self, source: &str) -> Result<Option<NaiveDate>, RepoError> {
        sqlx::query_scalar(
            r#"SELECT valuation_date FROM exchange_rates WHERE source_currency = $1 ORDER BY valuation_date DESC LIMIT 1"#,
        )
        .bind(source)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))
    }
}
