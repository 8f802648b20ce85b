mod config;
mod db;
mod errors;
mod export;
mod fuzzy;
mod handlers;
mod models;
mod normalize;
mod officers;
mod payments;
mod registry;
mod search;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::Database;
use crate::officers::OfficerDirectoryClient;
use crate::payments::{CheckoutProvider, EntitlementGate, PaymentLedger};
use crate::registry::PgRegistry;
use crate::search::SearchService;

/// Main entry point.
///
/// Initializes tracing, configuration, the database pool, the officer
/// registry client, the entitlement gate, and the HTTP routes, then serves.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "title_lookup_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize database connection pool
    let db = Database::new(&config.database_url).await?;
    tracing::info!("Database connection pool established");

    // Officer registry client; director search is rejected with a
    // configuration error when the key is absent.
    let officer_client = match config.usable_officer_registry_key() {
        Some(key) => {
            let client = OfficerDirectoryClient::new(
                config.officer_registry_base_url.clone(),
                key.to_string(),
            )
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;
            tracing::info!("Officer registry client initialized");
            Some(client)
        }
        None => None,
    };

    let registry = Arc::new(PgRegistry::new(db.pool.clone()));
    let search = SearchService::new(registry, officer_client);

    // Entitlement gate: payment-gated only when a provider key is present.
    let gate = match &config.payment_secret_key {
        Some(key) if config.payments_enabled() => EntitlementGate::Gated {
            ledger: Arc::new(PaymentLedger::new(db.pool.clone())),
            verifier: Arc::new(
                CheckoutProvider::new(key.clone()).map_err(|e| anyhow::anyhow!(e.to_string()))?,
            ),
        },
        _ => EntitlementGate::Free,
    };

    let port = config.port;
    let app_state = Arc::new(handlers::AppState {
        public_base_url: config.public_base_url.clone(),
        search,
        gate,
    });

    // Rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .unwrap(),
    );

    let protected_routes = Router::new()
        .route("/api/search", post(handlers::api_search))
        .route("/api/export/csv", post(handlers::export_csv))
        .route("/api/export/json", post(handlers::export_json))
        .route("/api/create-checkout", post(handlers::create_checkout))
        .layer(
            ServiceBuilder::new()
                // Request size limit: 1MB max payload
                .layer(RequestBodyLimitLayer::new(1024 * 1024))
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Health check bypasses rate limiting.
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
