//! Thin form-encoded client for the Stripe REST API. Only the three calls
//! this service needs: Checkout sessions, billing-portal sessions, and
//! subscription retrieval.

use reqwest::Client;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PortalSession {
    pub url: String,
}

/// The slice of Stripe's subscription object the billing handler needs.
#[derive(Debug, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub status: String,
    pub customer: String,
    pub cancel_at_period_end: bool,
    /// Unix epoch seconds.
    pub current_period_start: i64,
    pub current_period_end: i64,
    pub items: SubscriptionItems,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionItems {
    pub data: Vec<SubscriptionItem>,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionItem {
    pub price: Price,
}

#[derive(Debug, Deserialize)]
pub struct Price {
    pub id: String,
}

impl StripeSubscription {
    pub fn price_id(&self) -> Option<String> {
        self.items.data.first().map(|item| item.price.id.clone())
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

impl StripeClient {
    pub fn new(secret_key: String) -> Self {
        Self {
            client: Client::new(),
            secret_key,
        }
    }

    /// Creates a subscription-mode Checkout session carrying the user id in
    /// metadata; the webhook reads it back on `checkout.session.completed`.
    pub async fn create_checkout_session(
        &self,
        user_id: Uuid,
        price_id: &str,
        existing_customer_id: Option<&str>,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession, AppError> {
        let user_id = user_id.to_string();
        let mut params: Vec<(&str, &str)> = vec![
            ("mode", "subscription"),
            ("line_items[0][price]", price_id),
            ("line_items[0][quantity]", "1"),
            ("success_url", success_url),
            ("cancel_url", cancel_url),
            ("metadata[userId]", &user_id),
        ];
        if let Some(customer_id) = existing_customer_id {
            params.push(("customer", customer_id));
        }

        self.post_form("/checkout/sessions", &params).await
    }

    pub async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, AppError> {
        let params: Vec<(&str, &str)> =
            vec![("customer", customer_id), ("return_url", return_url)];

        self.post_form("/billing_portal/sessions", &params).await
    }

    pub async fn retrieve_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<StripeSubscription, AppError> {
        let response = self
            .client
            .get(format!("{STRIPE_API_BASE}/subscriptions/{subscription_id}"))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await
            .map_err(|e| AppError::Stripe(format!("request failed: {e}")))?;

        Self::handle_response(response).await
    }

    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, AppError> {
        let response = self
            .client
            .post(format!("{STRIPE_API_BASE}{path}"))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(params)
            .send()
            .await
            .map_err(|e| AppError::Stripe(format!("request failed: {e}")))?;

        Self::handle_response(response).await
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Stripe(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<StripeErrorBody>(&body)
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or(body);
            return Err(AppError::Stripe(format!("status {status}: {message}")));
        }

        serde_json::from_str(&body)
            .map_err(|e| AppError::Stripe(format!("unexpected response shape: {e}")))
    }
}
