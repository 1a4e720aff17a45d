//! Provider failover chain.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::Mutex;

use fx_providers::{ProviderFactory, ProviderKind};
use fx_types::{
    PriorityLedger, ProviderCredential, RateError, RateProvider, RatesRepository, Timeseries,
    today,
};

/// Hands out a working provider, walking the credential chain by ascending
/// priority and demoting every credential that fails along the way.
///
/// Selection attempts are serialised: each one re-reads the chain, may
/// rewrite every priority, and must not interleave with another.
pub struct ProviderSelector<R: RatesRepository> {
    repo: Arc<R>,
    factory: Arc<dyn ProviderFactory>,
    lock: Mutex<()>,
}

impl<R: RatesRepository> ProviderSelector<R> {
    pub fn new(repo: Arc<R>, factory: Arc<dyn ProviderFactory>) -> Self {
        Self {
            repo,
            factory,
            lock: Mutex::new(()),
        }
    }

    /// Returns the first enabled provider that instantiates and passes its
    /// health check.
    ///
    /// Only [`RateError::Provider`] failures demote a credential and move on;
    /// any other error ends the attempt. Fails with
    /// [`RateError::NoProviderAvailable`] once the chain comes back round to
    /// a credential that already failed, or when nothing is enabled.
    #[tracing::instrument(skip(self))]
    pub async fn create(&self) -> Result<Arc<dyn RateProvider>, RateError> {
        let mut tried = BTreeSet::new();
        let (_, provider) = self.select(&mut tried).await?;
        Ok(provider)
    }

    /// Fetches a time series from the chain.
    ///
    /// A provider that is selected but then fails the fetch itself with
    /// [`RateError::Provider`] is demoted like a failed health check, and the
    /// next credential gets the same request. The walk shares one set of
    /// failed names with selection, so it still ends in
    /// [`RateError::NoProviderAvailable`].
    #[tracing::instrument(skip(self))]
    pub async fn fetch_timeseries(
        &self,
        source: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<Timeseries, RateError> {
        let mut tried = BTreeSet::new();

        loop {
            let (name, provider) = self.select(&mut tried).await?;

            match provider.get_timeseries_rates(source, start_date, end_date).await {
                Err(RateError::Provider(reason)) => {
                    tried.insert(name.clone());
                    let _guard = self.lock.lock().await;
                    let mut ledger = PriorityLedger::new(self.repo.list_credentials().await?);
                    self.demote(&mut ledger, &name, &reason).await?;
                }
                other => return other,
            }
        }
    }

    async fn select(
        &self,
        tried: &mut BTreeSet<String>,
    ) -> Result<(String, Arc<dyn RateProvider>), RateError> {
        let _guard = self.lock.lock().await;

        let known = self.repo.all_codes().await?;

        loop {
            let mut ledger = PriorityLedger::new(self.repo.list_credentials().await?);

            let Some(candidate) = ledger.enabled().next().cloned() else {
                tracing::error!("No enabled exchange-rate provider configured");
                return Err(RateError::NoProviderAvailable);
            };

            if tried.contains(&candidate.name) {
                tracing::error!(tried = ?tried, "Every enabled provider failed");
                return Err(RateError::NoProviderAvailable);
            }

            match self.instantiate(&candidate, &known).await {
                Ok(provider) => {
                    tracing::debug!(provider = %candidate.name, "Provider selected");
                    return Ok((candidate.name, provider));
                }
                Err(RateError::Provider(reason)) => {
                    tried.insert(candidate.name.clone());
                    self.demote(&mut ledger, &candidate.name, &reason).await?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Caller holds `lock`.
    async fn demote(
        &self,
        ledger: &mut PriorityLedger,
        name: &str,
        reason: &str,
    ) -> Result<(), RateError> {
        if let Some(priority) = ledger.demote(name) {
            self.repo.save_priorities(&ledger.assignments()).await?;
            tracing::warn!(
                provider = %name,
                priority,
                %reason,
                "Provider failed, demoted to back of chain"
            );
        }
        Ok(())
    }

    async fn instantiate(
        &self,
        credential: &ProviderCredential,
        known: &BTreeSet<String>,
    ) -> Result<Arc<dyn RateProvider>, RateError> {
        let kind: ProviderKind = credential.name.parse()?;
        let provider = self.factory.build(kind, credential, known)?;

        if kind.requires_health_check() {
            if let Some(sample) = known.iter().next() {
                let day = today().to_string();
                provider.get_timeseries_rates(sample, &day, &day).await?;
            }
        }

        Ok(provider)
    }
}
