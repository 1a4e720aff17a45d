//! Amount conversion at today's rates.

use std::collections::BTreeMap;
use std::sync::Arc;

use fx_types::{ConversionResult, DateRange, RateError, RatesRepository, today};

use super::refresher::BackgroundRefresher;
use super::resolver::RateResolver;

pub struct Converter<R: RatesRepository> {
    resolver: Arc<RateResolver<R>>,
    maintenance: Option<Arc<BackgroundRefresher<R>>>,
}

impl<R: RatesRepository> Converter<R> {
    pub fn new(
        resolver: Arc<RateResolver<R>>,
        maintenance: Option<Arc<BackgroundRefresher<R>>>,
    ) -> Self {
        Self {
            resolver,
            maintenance,
        }
    }

    /// Converts `amount` of `source` into each target at today's rate.
    ///
    /// `targets = None` means every other known currency. Unknown codes (and
    /// the source itself) are dropped, not rejected. A target with no
    /// resolved rate, or any target when `amount` is `None`, maps to `None`.
    #[tracing::instrument(skip(self))]
    pub async fn convert(
        &self,
        source: &str,
        targets: Option<Vec<String>>,
        amount: Option<f64>,
    ) -> Result<ConversionResult, RateError> {
        let date = today();
        let request = self.resolver.prepare(source, DateRange::single(date)).await?;

        let wanted: Vec<String> = match targets {
            None => request.targets.iter().cloned().collect(),
            Some(codes) => codes
                .into_iter()
                .map(|code| code.trim().to_ascii_uppercase())
                .filter(|code| request.targets.contains(code))
                .collect(),
        };

        let table = self.resolver.resolve(&request).await?;
        let rates = table.get(&date);

        let exchanged_currency = wanted
            .into_iter()
            .map(|code| {
                let converted = rates
                    .and_then(|day| day.get(&code))
                    .zip(amount)
                    .map(|(rate, amount)| rate * amount);
                (code, converted)
            })
            .collect();

        if let Some(maintenance) = &self.maintenance {
            maintenance.trigger();
        }

        Ok(ConversionResult {
            date,
            source_currency: BTreeMap::from([(request.source, amount)]),
            exchanged_currency,
        })
    }
}
