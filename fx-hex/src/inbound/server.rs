//! HTTP Server configuration and startup.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, patch, post},
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use fx_repo::security::ApiKeyDigest;
use fx_types::RatesRepository;

use super::auth::auth_middleware;
use super::handlers::{self, AppState};
use crate::RateService;
use crate::openapi::ApiDoc;

/// HTTP Server for the exchange-rate API.
pub struct HttpServer<R: RatesRepository> {
    state: Arc<AppState<R>>,
}

impl<R: RatesRepository> HttpServer<R> {
    /// Creates a new HTTP server.
    ///
    /// Clients must present the key behind `api_key` as a bearer token on
    /// `/api/*`.
    pub fn new(service: RateService<R>, api_key: ApiKeyDigest) -> Self {
        Self {
            state: Arc::new(AppState {
                service,
                api_key,
            }),
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        // Build HTTP metrics layer (uses globally set MeterProvider)
        let metrics = axum_otel_metrics::HttpMetricsLayerBuilder::new().build();

        Router::new()
            .route("/health", get(handlers::health))
            .route("/api/rates", get(handlers::get_rates::<R>))
            .route("/api/convert", get(handlers::convert::<R>))
            .route("/api/refresh", post(handlers::refresh::<R>))
            .route(
                "/api/currencies",
                get(handlers::list_currencies::<R>).post(handlers::create_currency::<R>),
            )
            .route(
                "/api/currencies/{code}",
                get(handlers::get_currency::<R>).patch(handlers::update_currency::<R>),
            )
            .route(
                "/api/providers",
                get(handlers::list_providers::<R>).post(handlers::create_provider::<R>),
            )
            .route("/api/providers/{id}", patch(handlers::update_provider::<R>))
            .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
            .layer(metrics)
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                auth_middleware::<R>,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
