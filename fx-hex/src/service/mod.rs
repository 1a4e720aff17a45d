//! Exchange-Rate Application Service
//!
//! Orchestrates rate resolution, conversion and cache maintenance through the
//! repository and provider ports. Contains NO infrastructure logic.
//!
//! ```text
//! Converter -> RateResolver -> Populator -> ProviderSelector -> RateProvider
//!                   |              |
//!                   +--> RateStore <+
//! ```

mod converter;
mod populate;
mod refresher;
mod resolver;
mod selector;

use std::sync::Arc;

use fx_providers::ProviderFactory;
use fx_types::{
    AppError, ConversionResult, ConvertQuery, CreateCurrencyRequest, CreateProviderRequest,
    CredentialId, Currency, DateRange, PopulateReport, ProviderCredential, ProviderResponse,
    RateTable, RatesQuery, RatesRepository, RefreshReport, UpdateCurrencyRequest,
    UpdateProviderRequest,
};

pub use converter::Converter;
pub use populate::Populator;
pub use refresher::BackgroundRefresher;
pub use resolver::{RateRequest, RateResolver};
pub use selector::ProviderSelector;

/// Tunables for the service layer.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Populate passes the resolver may make before `StalledResolution`
    pub max_resolve_attempts: u32,
    /// Schedule a background sweep after reads and after currency creation
    pub refresh_on_read: bool,
    /// Look-back for currencies with no cached rates
    pub lookback_days: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_resolve_attempts: 3,
            refresh_on_read: true,
            lookback_days: 365,
        }
    }
}

/// Application service for exchange-rate operations.
///
/// Generic over `R: RatesRepository` - the storage adapter is injected at
/// compile time. Providers come from the injected [`ProviderFactory`].
pub struct RateService<R: RatesRepository> {
    repo: Arc<R>,
    populator: Arc<Populator<R>>,
    resolver: Arc<RateResolver<R>>,
    converter: Converter<R>,
    maintenance: Arc<BackgroundRefresher<R>>,
    config: ServiceConfig,
}

impl<R: RatesRepository> RateService<R> {
    pub fn new(repo: R, factory: Arc<dyn ProviderFactory>, config: ServiceConfig) -> Self {
        let repo = Arc::new(repo);
        let selector = ProviderSelector::new(Arc::clone(&repo), factory);
        let populator = Arc::new(Populator::new(Arc::clone(&repo), selector));
        let maintenance = Arc::new(BackgroundRefresher::new(
            Arc::clone(&repo),
            Arc::clone(&populator),
            config.lookback_days,
        ));

        let on_read = config.refresh_on_read.then(|| Arc::clone(&maintenance));
        let resolver = Arc::new(RateResolver::new(
            Arc::clone(&repo),
            Arc::clone(&populator),
            on_read.clone(),
            config.max_resolve_attempts,
        ));
        let converter = Converter::new(Arc::clone(&resolver), on_read);

        Self {
            repo,
            populator,
            resolver,
            converter,
            maintenance,
            config,
        }
    }

    /// Returns a reference to the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Rates
    // ─────────────────────────────────────────────────────────────────────────────

    /// Cached (or freshly fetched) rates for a source over a date range.
    pub async fn rates(&self, query: RatesQuery) -> Result<RateTable, AppError> {
        let range = DateRange::parse(&query.date_from, &query.date_to)?;
        let request = self.resolver.prepare(&query.source_currency, range).await?;
        Ok(self.resolver.resolve(&request).await?)
    }

    /// Converts an amount at today's rates.
    pub async fn convert(&self, query: ConvertQuery) -> Result<ConversionResult, AppError> {
        let targets = query.targets();
        Ok(self
            .converter
            .convert(&query.source_currency, targets, query.amount)
            .await?)
    }

    /// Populates one source over an explicit range.
    pub async fn populate(&self, source: &str, range: DateRange) -> Result<PopulateReport, AppError> {
        let source =
            Currency::normalize_code(source).map_err(|e| AppError::BadRequest(e.to_string()))?;
        Ok(self.populator.populate(&source, range).await?)
    }

    /// Runs a full refresh sweep and waits for it.
    pub async fn refresh(&self) -> Result<RefreshReport, AppError> {
        Ok(self.maintenance.run_sweep().await?)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Currency registry
    // ─────────────────────────────────────────────────────────────────────────────

    /// Registers a currency and schedules a sweep to fill its history.
    pub async fn create_currency(&self, req: CreateCurrencyRequest) -> Result<Currency, AppError> {
        let currency = Currency::new(&req.code, req.name, req.symbol)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        let currency = self.repo.create_currency(currency).await?;

        if self.config.refresh_on_read {
            self.maintenance.trigger();
        }
        Ok(currency)
    }

    pub async fn get_currency(&self, code: &str) -> Result<Currency, AppError> {
        let code = code.trim().to_ascii_uppercase();
        self.repo
            .get_currency(&code)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Currency {}", code)))
    }

    pub async fn list_currencies(&self) -> Result<Vec<Currency>, AppError> {
        Ok(self.repo.list_currencies().await?)
    }

    /// Renames a currency or changes its symbol; the code never changes.
    pub async fn update_currency(
        &self,
        code: &str,
        req: UpdateCurrencyRequest,
    ) -> Result<Currency, AppError> {
        let existing = self.get_currency(code).await?;
        let currency = Currency::new(
            &existing.code,
            req.name.unwrap_or(existing.name),
            req.symbol.unwrap_or(existing.symbol),
        )
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
        Ok(self.repo.update_currency(currency).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Provider credentials
    // ─────────────────────────────────────────────────────────────────────────────

    pub async fn create_provider(
        &self,
        req: CreateProviderRequest,
    ) -> Result<ProviderResponse, AppError> {
        let credential =
            ProviderCredential::new(req.name, req.token, req.url, req.priority, req.enabled)
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
        let credential = self.repo.create_credential(credential).await?;
        Ok(credential.into())
    }

    /// Applies the fields present in `req` to one credential.
    pub async fn update_provider(
        &self,
        id: CredentialId,
        req: UpdateProviderRequest,
    ) -> Result<ProviderResponse, AppError> {
        let existing = self
            .repo
            .get_credential(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Provider {}", id)))?;

        let mut credential = ProviderCredential::new(
            existing.name,
            req.token.unwrap_or(existing.token),
            req.url.unwrap_or(existing.url),
            req.priority.unwrap_or(existing.priority),
            req.enabled.unwrap_or(existing.enabled),
        )
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
        credential.id = existing.id;

        let credential = self.repo.update_credential(credential).await?;
        Ok(credential.into())
    }

    /// Credentials in failover order.
    pub async fn list_providers(&self) -> Result<Vec<ProviderResponse>, AppError> {
        Ok(self
            .repo
            .list_credentials()
            .await?
            .into_iter()
            .map(ProviderResponse::from)
            .collect())
    }
}
