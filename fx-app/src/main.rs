//! # Exchange-Rate Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize the repository adapter
//! - Create the rate service with the provider factory
//! - Start the HTTP server

mod config;

use std::sync::Arc;

use opentelemetry::global;
use opentelemetry_sdk::{
    metrics::SdkMeterProvider, propagation::TraceContextPropagator, trace as sdktrace,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fx_hex::{RateService, inbound::HttpServer};
use fx_providers::DefaultProviderFactory;
use fx_repo::{build_repo, security::ApiKeyDigest};

fn init_tracer() -> anyhow::Result<(sdktrace::Tracer, sdktrace::SdkTracerProvider)> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    // Use gRPC exporter with batch processing (non-blocking)
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()?;

    let provider = sdktrace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build();

    global::set_tracer_provider(provider.clone());

    use opentelemetry::trace::TracerProvider as _;
    Ok((provider.tracer("fx-service"), provider))
}

/// Installs the global meter provider read by the HTTP metrics layer.
fn init_meter() -> anyhow::Result<SdkMeterProvider> {
    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .build()?;

    let provider = SdkMeterProvider::builder()
        .with_periodic_exporter(exporter)
        .build();

    global::set_meter_provider(provider.clone());
    Ok(provider)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize OpenTelemetry tracing and metrics
    let (otel_tracer, otel_provider) = init_tracer()?;
    let meter_provider = init_meter()?;
    let telemetry = tracing_opentelemetry::layer().with_tracer(otel_tracer);

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fx_app=debug,fx_hex=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry)
        .init();

    // Load configuration
    let config = config::Config::from_env()?;

    tracing::info!("Starting exchange-rate server on port {}", config.port);
    tracing::info!(
        max_resolve_attempts = config.service.max_resolve_attempts,
        refresh_on_read = config.service.refresh_on_read,
        lookback_days = config.service.lookback_days,
        "Service configuration"
    );

    // Build repository (handles connection and migration)
    let repo = build_repo(&config.database_url).await?;

    // Providers share one HTTP client and one outbound quota
    let factory = Arc::new(DefaultProviderFactory::new(
        config.provider_requests_per_minute,
        config.provider_timeout,
    ));

    let service = RateService::new(repo, factory, config.service.clone());

    // Create and run the HTTP server
    let api_key = ApiKeyDigest::of(&config.api_key);
    tracing::info!(fingerprint = %api_key.fingerprint(), "API key loaded");
    let server = HttpServer::new(service, api_key);
    let addr = format!("0.0.0.0:{}", config.port);

    server.run(&addr).await?;

    // Ensure telemetry is flushed before exit
    let _ = meter_provider.shutdown();
    let _ = otel_provider.shutdown();
    Ok(())
}
