//! Data Transfer Objects (DTOs) for requests and responses.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};

use crate::domain::{CredentialId, ProviderCredential};

// ─────────────────────────────────────────────────────────────────────────────
// Rate lookup & conversion DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Query for cached (or freshly fetched) rates over a date range.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RatesQuery {
    /// Currency the rates are quoted from
    #[schema(example = "USD")]
    pub source_currency: String,
    /// Inclusive start date (YYYY-MM-DD)
    #[schema(example = "2025-01-01")]
    pub date_from: String,
    /// Inclusive end date (YYYY-MM-DD)
    #[schema(example = "2025-01-07")]
    pub date_to: String,
}

/// Query for converting an amount at today's rates.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ConvertQuery {
    #[schema(example = "USD")]
    pub source_currency: String,
    /// Comma-separated target codes; all other known currencies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "EUR,GBP")]
    pub exchanged_currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = 100.0)]
    pub amount: Option<f64>,
}

impl ConvertQuery {
    /// Splits `exchanged_currency` into trimmed, upper-cased codes.
    pub fn targets(&self) -> Option<Vec<String>> {
        self.exchanged_currency.as_ref().map(|raw| {
            raw.split(',')
                .map(|code| code.trim().to_ascii_uppercase())
                .filter(|code| !code.is_empty())
                .collect()
        })
    }
}

/// Result of a conversion. Targets without an amount or a resolved rate
/// carry `null` rather than being omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ConversionResult {
    #[schema(value_type = String, example = "2025-01-01")]
    pub date: NaiveDate,
    #[schema(example = json!({"USD": 100.0}))]
    pub source_currency: BTreeMap<String, Option<f64>>,
    #[schema(example = json!({"EUR": 93.0, "GBP": null}))]
    pub exchanged_currency: BTreeMap<String, Option<f64>>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Populate & refresh DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Rows written (or already present) by one populate run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PopulateReport {
    pub inserted: u64,
    pub skipped: u64,
}

/// Outcome of refreshing one currency during a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RefreshOutcome {
    #[schema(example = "USD")]
    pub currency: String,
    /// First date requested from the provider
    #[schema(value_type = String, example = "2025-01-01")]
    pub from: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub populated: Option<PopulateReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of a full refresh sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RefreshReport {
    /// Currencies whose newest cached date is already today
    pub up_to_date: Vec<String>,
    /// Currencies skipped because a refresh was already running
    pub in_flight: Vec<String>,
    pub refreshed: Vec<RefreshOutcome>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to register a currency.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateCurrencyRequest {
    #[schema(example = "CHF")]
    pub code: String,
    #[schema(example = "Swiss Franc")]
    pub name: String,
    #[serde(default)]
    #[schema(example = "Fr.")]
    pub symbol: String,
}

/// Request to rename a currency or change its symbol. The code is the join
/// key for stored rates and cannot change.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateCurrencyRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "Swiss Franc")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "CHF")]
    pub symbol: Option<String>,
}

/// Request to register a provider credential.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateProviderRequest {
    /// Adapter name, e.g. `CurrencyBeacon` or `Mock`
    #[schema(example = "CurrencyBeacon")]
    pub name: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    #[schema(example = "https://api.currencybeacon.com")]
    pub url: String,
    #[schema(example = 0)]
    pub priority: i32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Partial update of a provider credential; absent fields are kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateProviderRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = 1)]
    pub priority: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = false)]
    pub enabled: Option<bool>,
}

/// A credential as exposed over the API; the token is never returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProviderResponse {
    pub id: CredentialId,
    #[schema(example = "CurrencyBeacon")]
    pub name: String,
    pub url: String,
    pub priority: i32,
    pub enabled: bool,
}

impl From<ProviderCredential> for ProviderResponse {
    fn from(c: ProviderCredential) -> Self {
        Self {
            id: c.id,
            name: c.name,
            url: c.url,
            priority: c.priority,
            enabled: c.enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_targets_are_split_and_normalised() {
        let query = ConvertQuery {
            source_currency: "USD".into(),
            exchanged_currency: Some("eur, gbp,,".into()),
            amount: None,
        };
        assert_eq!(query.targets(), Some(vec!["EUR".into(), "GBP".into()]));
        assert_eq!(ConvertQuery::default().targets(), None);
    }

    #[test]
    fn test_update_provider_fields_are_optional() {
        let req: UpdateProviderRequest =
            serde_json::from_value(serde_json::json!({"enabled": false})).unwrap();
        assert_eq!(req.enabled, Some(false));
        assert!(req.priority.is_none() && req.token.is_none() && req.url.is_none());
    }

    #[test]
    fn test_conversion_result_serialises_missing_as_null() {
        let result = ConversionResult {
            date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            source_currency: BTreeMap::from([("USD".to_string(), None)]),
            exchanged_currency: BTreeMap::from([("EUR".to_string(), None)]),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "date": "2025-01-01",
                "source_currency": {"USD": null},
                "exchanged_currency": {"EUR": null}
            })
        );
    }
}
