mod ai;
mod auth;
mod billing;
mod config;
mod db;
mod errors;
mod metering;
mod models;
mod pdf;
mod plans;
mod routes;
mod state;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::ai::AiChain;
use crate::billing::stripe_client::StripeClient;
use crate::config::Config;
use crate::db::create_pool;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::postgres::PgSubscriptionStore;
use crate::store::SubscriptionStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Craftfolio API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (runs pending migrations)
    let pool = create_pool(&config.database_url).await?;

    let subscriptions: Arc<dyn SubscriptionStore> =
        Arc::new(PgSubscriptionStore::new(pool.clone()));

    // AI provider chain: Gemini → Groq → deterministic mock. Providers
    // without an API key are skipped.
    let ai = Arc::new(AiChain::from_config(&config));
    info!(
        "AI chain initialized (gemini: {}, groq: {})",
        config.gemini_api_key.is_some(),
        config.groq_api_key.is_some()
    );

    let stripe = StripeClient::new(config.stripe_secret_key.clone());
    info!("Stripe client initialized");

    let state = AppState {
        db: pool,
        subscriptions,
        ai,
        stripe,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
