//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use fx_repo::security::ApiKeyDigest;
use fx_types::{
    AppError, ConvertQuery, CreateCurrencyRequest, CreateProviderRequest, CredentialId,
    RatesQuery, RatesRepository, UpdateCurrencyRequest, UpdateProviderRequest,
};

use crate::RateService;

/// Application state shared across handlers.
pub struct AppState<R: RatesRepository> {
    pub service: RateService<R>,
    pub api_key: ApiKeyDigest,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self.0 {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({
            "error": message,
            "code": status.as_u16()
        });

        (status, Json(body)).into_response()
    }
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Rates
// ─────────────────────────────────────────────────────────────────────────────

/// Rates for a source currency over an inclusive date range.
#[tracing::instrument(skip(state), fields(source = %query.source_currency))]
pub async fn get_rates<R: RatesRepository>(
    State(state): State<Arc<AppState<R>>>,
    Query(query): Query<RatesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let table = state.service.rates(query).await?;
    Ok(Json(table))
}

/// Converts an amount at today's rates.
#[tracing::instrument(skip(state), fields(source = %query.source_currency))]
pub async fn convert<R: RatesRepository>(
    State(state): State<Arc<AppState<R>>>,
    Query(query): Query<ConvertQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state.service.convert(query).await?;
    Ok(Json(result))
}

/// Runs a full refresh sweep and returns its report.
#[tracing::instrument(skip(state))]
pub async fn refresh<R: RatesRepository>(
    State(state): State<Arc<AppState<R>>>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.service.refresh().await?;
    Ok(Json(report))
}

// ─────────────────────────────────────────────────────────────────────────────
// Currencies
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip(state), fields(code = %req.code))]
pub async fn create_currency<R: RatesRepository>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<CreateCurrencyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let currency = state.service.create_currency(req).await?;
    Ok((StatusCode::CREATED, Json(currency)))
}

#[tracing::instrument(skip(state))]
pub async fn list_currencies<R: RatesRepository>(
    State(state): State<Arc<AppState<R>>>,
) -> Result<impl IntoResponse, ApiError> {
    let currencies = state.service.list_currencies().await?;
    Ok(Json(currencies))
}

#[tracing::instrument(skip(state))]
pub async fn get_currency<R: RatesRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let currency = state.service.get_currency(&code).await?;
    Ok(Json(currency))
}

#[tracing::instrument(skip(state, req))]
pub async fn update_currency<R: RatesRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(code): Path<String>,
    Json(req): Json<UpdateCurrencyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let currency = state.service.update_currency(&code, req).await?;
    Ok(Json(currency))
}

// ─────────────────────────────────────────────────────────────────────────────
// Provider credentials
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip(state, req), fields(name = %req.name, priority = req.priority))]
pub async fn create_provider<R: RatesRepository>(
    State(state): State<Arc<AppState<R>>>,
    Json(req): Json<CreateProviderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let provider = state.service.create_provider(req).await?;
    Ok((StatusCode::CREATED, Json(provider)))
}

/// Credentials in failover order; tokens are never returned.
#[tracing::instrument(skip(state))]
pub async fn list_providers<R: RatesRepository>(
    State(state): State<Arc<AppState<R>>>,
) -> Result<impl IntoResponse, ApiError> {
    let providers = state.service.list_providers().await?;
    Ok(Json(providers))
}

/// Changes token, url, priority or the enabled flag of one credential.
#[tracing::instrument(skip(state, req), fields(enabled = ?req.enabled, priority = ?req.priority))]
pub async fn update_provider<R: RatesRepository>(
    State(state): State<Arc<AppState<R>>>,
    Path(id): Path<CredentialId>,
    Json(req): Json<UpdateProviderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let provider = state.service.update_provider(id, req).await?;
    Ok(Json(provider))
}
