pub mod ats;
pub mod billing;
pub mod health;
pub mod portfolios;
pub mod resumes;
pub mod subscription;
pub mod tailor;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Uploaded resume PDFs are capped at 10 MiB.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Plan catalog + subscription summary
        .route("/api/v1/plans", get(subscription::handle_list_plans))
        .route(
            "/api/v1/subscription",
            get(subscription::handle_get_subscription),
        )
        // AI features (metered)
        .route("/api/v1/ats", post(ats::handle_ats_check))
        .route("/api/v1/tailor", post(tailor::handle_tailor))
        // Resume CRUD (creation metered)
        .route(
            "/api/v1/resumes",
            post(resumes::handle_create).get(resumes::handle_list),
        )
        .route(
            "/api/v1/resumes/:id",
            get(resumes::handle_get)
                .put(resumes::handle_update)
                .delete(resumes::handle_delete),
        )
        // Portfolio CRUD (creation metered) + public site
        .route(
            "/api/v1/portfolios",
            post(portfolios::handle_create).get(portfolios::handle_list),
        )
        .route(
            "/api/v1/portfolios/:id",
            get(portfolios::handle_get)
                .put(portfolios::handle_update)
                .delete(portfolios::handle_delete),
        )
        .route("/p/:slug", get(portfolios::handle_public))
        // Billing
        .route(
            "/api/v1/billing/checkout",
            post(billing::handle_create_checkout),
        )
        .route("/api/v1/billing/portal", post(billing::handle_create_portal))
        .route("/api/v1/billing/webhook", post(billing::handle_webhook))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
