//! Stock Statistics Gateway
//!
//! A REST API that computes descriptive statistics over tick-level stock price
//! histories fetched on demand from a remote pricing source.
//!
//! # Architecture
//!
//! The API follows clean/onion architecture with clear separation of concerns:
//! - **Domain**: Price entities, the upstream response shape, collaborator traits
//! - **Application**: Statistics, time alignment, token caching, aggregation
//! - **Infrastructure**: HTTP clients for the pricing source (auth + stocks)
//! - **API**: HTTP handlers, routing, and middleware
//!
//! # Configuration
//!
//! The API is configured via `config.yaml` and environment variables:
//! - `CONFIG_PATH`: configuration file (default: config.yaml)
//! - `EMAIL`, `NAME`, `ROLL_NO`, `ACCESS_CODE`, `CLIENT_ID`, `CLIENT_SECRET`:
//!   service credentials for the pricing source (required)
//! - `UPSTREAM_BASE_URL`: overrides `upstream.base_url`
//! - `PORT`: overrides `server.port`
//! - `RUST_LOG`: Logging level (default: info)
//! - `LOG_FORMAT`: `json` for structured logs (default: text)
//!
//! # Quick Start
//!
//! ```bash
//! cp .env.example .env   # fill in credentials
//! cargo run --release
//!
//! curl http://localhost:3001/health
//! curl "http://localhost:3001/stocks/AAPL?minutes=60&aggregation=average"
//! curl "http://localhost:3001/stockcorrelation?minutes=60&ticker=AAPL&ticker=MSFT"
//! ```

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::env;
use std::sync::Arc;
use stockstats_gateway::api::routes::create_router;
use stockstats_gateway::api::state::AppState;
use stockstats_gateway::application::{AggregationService, TokenCache};
use stockstats_gateway::config::{AppConfig, ServiceCredentials};
use stockstats_gateway::infrastructure::{build_http_client, AuthClient, PricingClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let env_filter = EnvFilter::new(env::var("RUST_LOG").unwrap_or_else(|_| "info".into()));

    if log_format.eq_ignore_ascii_case("json") {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // Load Config
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
    let mut config = AppConfig::load(&config_path)?;
    config.apply_env_overrides(|key| env::var(key).ok());
    let credentials = ServiceCredentials::from_env()?;

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    // Infrastructure
    let http = build_http_client(config.upstream.request_timeout())?;
    let auth_client = Arc::new(AuthClient::new(
        http.clone(),
        &config.upstream.base_url,
        credentials,
    ));
    let pricing_client = Arc::new(PricingClient::new(http, &config.upstream.base_url));
    tracing::info!(
        "Pricing source: {} (timeout {}s)",
        config.upstream.base_url,
        config.upstream.request_timeout_secs
    );

    // Application
    let token_cache = Arc::new(TokenCache::new(auth_client, config.upstream.token_ttl()));
    let aggregation_service = Arc::new(AggregationService::new(token_cache, pricing_client));

    let state = AppState {
        aggregation_service,
        metrics,
        upstream_base_url: config.upstream.base_url.clone(),
    };

    let app = create_router(state, &config.server.allowed_origins);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to address {}", addr))?;
    tracing::info!("Stock statistics gateway running at http://{}", addr);

    // Graceful shutdown handling
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error during operation")?;

    Ok(())
}

/// Wait for SIGTERM or SIGINT (Ctrl+C) to initiate graceful shutdown
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
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        },
    }
}
