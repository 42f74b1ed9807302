use std::sync::Arc;

use sqlx::PgPool;

use crate::ai::AiChain;
use crate::billing::stripe_client::StripeClient;
use crate::config::Config;
use crate::store::SubscriptionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Subscription persistence behind a trait so the metering/billing cores
    /// run against the in-memory store in tests.
    pub subscriptions: Arc<dyn SubscriptionStore>,
    pub ai: Arc<AiChain>,
    pub stripe: StripeClient,
    pub config: Config,
}
