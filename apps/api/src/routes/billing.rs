//! Billing routes: Checkout session, billing-portal session, and the
//! Stripe webhook endpoint.

use axum::{extract::State, http::HeaderMap, Json};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use crate::auth::AuthUser;
use crate::billing::{events, webhook};
use crate::errors::AppError;
use crate::metering;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub url: String,
}

/// POST /api/v1/billing/checkout
///
/// Starts a Pro upgrade. The session carries the user id in metadata so the
/// `checkout.session.completed` webhook can find the local record.
pub async fn handle_create_checkout(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<SessionResponse>, AppError> {
    let subscription =
        metering::get_or_create_subscription(state.subscriptions.as_ref(), user_id).await?;

    let base = &state.config.app_base_url;
    let session = state
        .stripe
        .create_checkout_session(
            user_id,
            &state.config.stripe_pro_price_id,
            subscription.stripe_customer_id.as_deref(),
            &format!("{base}/dashboard/billing?checkout=success"),
            &format!("{base}/dashboard/billing?checkout=canceled"),
        )
        .await?;

    let url = session
        .url
        .ok_or_else(|| AppError::Stripe("Checkout session has no redirect URL".to_string()))?;

    Ok(Json(SessionResponse { url }))
}

/// POST /api/v1/billing/portal
pub async fn handle_create_portal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<SessionResponse>, AppError> {
    let subscription =
        metering::get_or_create_subscription(state.subscriptions.as_ref(), user_id).await?;

    let Some(customer_id) = subscription.stripe_customer_id.as_deref() else {
        return Err(AppError::Validation(
            "No billing account on file; complete a checkout first".to_string(),
        ));
    };

    let session = state
        .stripe
        .create_portal_session(
            customer_id,
            &format!("{}/dashboard/billing", state.config.app_base_url),
        )
        .await?;

    Ok(Json(SessionResponse { url: session.url }))
}

/// POST /api/v1/billing/webhook
///
/// Called by Stripe, not by the frontend. The raw body is needed for
/// signature verification, so this handler takes `String` rather than a
/// typed extractor.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Value>, AppError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Validation("Missing Stripe signature".to_string()))?;

    webhook::verify_signature(&body, signature, &state.config.stripe_webhook_secret)?;

    let event = webhook::parse_event(&body)?;
    info!("Stripe webhook received: {}", event.event_type);

    if let Some(billing_event) = webhook::to_billing_event(&event, &state.stripe).await? {
        events::handle_event(state.subscriptions.as_ref(), billing_event).await?;
    }

    Ok(Json(json!({ "received": true })))
}
