//! OpenAPI specification and documentation.

#![allow(dead_code)] // Path functions are only used by utoipa for documentation generation

use fx_types::domain::{CredentialId, Currency};
use fx_types::dto::{
    ConversionResult, ConvertQuery, CreateCurrencyRequest, CreateProviderRequest, PopulateReport,
    ProviderResponse, RatesQuery, RefreshOutcome, RefreshReport, UpdateCurrencyRequest,
    UpdateProviderRequest,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};

// Dummy functions to generate path documentation
// These are not the actual handlers, just for OpenAPI path generation

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = inline(serde_json::Value), example = json!({"status": "healthy"}))
    )
)]
async fn health() {}

/// Rates for a source currency over an inclusive date range
///
/// Served from the cache; missing dates are fetched from the provider chain first.
#[utoipa::path(
    get,
    path = "/api/rates",
    tag = "rates",
    params(RatesQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "date -> (target -> rate)", body = inline(serde_json::Value),
            example = json!({"2025-01-01": {"EUR": 0.93, "GBP": 0.8}})),
        (status = 400, description = "Malformed date or start after end"),
        (status = 404, description = "Unknown source currency"),
        (status = 502, description = "Provider returned an error"),
        (status = 503, description = "No provider available or resolution stalled"),
        (status = 401, description = "Unauthorized")
    )
)]
async fn get_rates() {}

/// Convert an amount at today's rates
#[utoipa::path(
    get,
    path = "/api/convert",
    tag = "rates",
    params(ConvertQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Converted amounts; unknown targets dropped, missing rates null", body = ConversionResult),
        (status = 404, description = "Unknown source currency"),
        (status = 503, description = "No provider available or resolution stalled"),
        (status = 401, description = "Unauthorized")
    )
)]
async fn convert() {}

/// Bring every currency's cache up to today
#[utoipa::path(
    post,
    path = "/api/refresh",
    tag = "rates",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Per-currency refresh report", body = RefreshReport),
        (status = 401, description = "Unauthorized")
    )
)]
async fn refresh() {}

/// Register a currency
#[utoipa::path(
    post,
    path = "/api/currencies",
    tag = "currencies",
    request_body = CreateCurrencyRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Currency registered", body = Currency),
        (status = 400, description = "Invalid currency code or name"),
        (status = 409, description = "Currency already exists"),
        (status = 401, description = "Unauthorized")
    )
)]
async fn create_currency() {}

/// List all currencies
#[utoipa::path(
    get,
    path = "/api/currencies",
    tag = "currencies",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Currencies ordered by code", body = Vec<Currency>),
        (status = 401, description = "Unauthorized")
    )
)]
async fn list_currencies() {}

/// Get a currency by code
#[utoipa::path(
    get,
    path = "/api/currencies/{code}",
    tag = "currencies",
    security(("bearer_auth" = [])),
    params(
        ("code" = String, Path, description = "ISO currency code")
    ),
    responses(
        (status = 200, description = "Currency details", body = Currency),
        (status = 404, description = "Currency not found"),
        (status = 401, description = "Unauthorized")
    )
)]
async fn get_currency() {}

/// Rename a currency or change its symbol
#[utoipa::path(
    patch,
    path = "/api/currencies/{code}",
    tag = "currencies",
    request_body = UpdateCurrencyRequest,
    security(("bearer_auth" = [])),
    params(
        ("code" = String, Path, description = "ISO currency code")
    ),
    responses(
        (status = 200, description = "Updated currency", body = Currency),
        (status = 400, description = "Blank name"),
        (status = 404, description = "Currency not found"),
        (status = 401, description = "Unauthorized")
    )
)]
async fn update_currency() {}

/// Register a provider credential
#[utoipa::path(
    post,
    path = "/api/providers",
    tag = "providers",
    request_body = CreateProviderRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Provider registered", body = ProviderResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Provider name already exists"),
        (status = 401, description = "Unauthorized")
    )
)]
async fn create_provider() {}

/// List provider credentials in failover order
#[utoipa::path(
    get,
    path = "/api/providers",
    tag = "providers",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Credentials by ascending priority", body = Vec<ProviderResponse>),
        (status = 401, description = "Unauthorized")
    )
)]
async fn list_providers() {}

/// Update a provider credential
///
/// Disabling a credential takes it out of the failover chain without losing
/// its place.
#[utoipa::path(
    patch,
    path = "/api/providers/{id}",
    tag = "providers",
    request_body = UpdateProviderRequest,
    security(("bearer_auth" = [])),
    params(
        ("id" = CredentialId, Path, description = "Credential id")
    ),
    responses(
        (status = 200, description = "Updated credential", body = ProviderResponse),
        (status = 400, description = "Negative priority or malformed id"),
        (status = 404, description = "Credential not found"),
        (status = 401, description = "Unauthorized")
    )
)]
async fn update_provider() {}

/// OpenAPI documentation for the exchange-rate API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Exchange Rate Service API",
        version = "1.0.0",
        description = "Historical exchange rates and currency conversion, served from a local cache that is filled on demand from a failover chain of rate providers.\n\n## Authentication\n\nEvery `/api` endpoint requires the configured API key as a Bearer token:\n\n```\nAuthorization: Bearer <API_KEY>\n```",
        license(name = "MIT"),
    ),
    paths(
        health,
        get_rates,
        convert,
        refresh,
        create_currency,
        list_currencies,
        get_currency,
        update_currency,
        create_provider,
        list_providers,
        update_provider,
    ),
    components(
        schemas(
            Currency,
            CredentialId,
            RatesQuery,
            ConvertQuery,
            ConversionResult,
            PopulateReport,
            RefreshOutcome,
            RefreshReport,
            CreateCurrencyRequest,
            CreateProviderRequest,
            UpdateCurrencyRequest,
            UpdateProviderRequest,
            ProviderResponse,
        )
    ),

    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rates", description = "Rate lookup, conversion and cache refresh"),
        (name = "currencies", description = "Currency registry"),
        (name = "providers", description = "Rate provider credentials"),
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for Bearer token authentication.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/api/rates",
            "/api/convert",
            "/api/refresh",
            "/api/currencies",
            "/api/currencies/{code}",
            "/api/providers",
            "/api/providers/{id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
