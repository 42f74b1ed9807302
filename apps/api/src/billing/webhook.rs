//! Stripe webhook intake: signature verification and mapping of raw events
//! onto domain `BillingEvent`s. The billing handler itself never sees
//! unverified or Stripe-shaped data.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::billing::events::BillingEvent;
use crate::billing::stripe_client::{StripeClient, StripeSubscription};
use crate::errors::AppError;

/// Events older than this are rejected to blunt replay.
const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

/// Verifies a `Stripe-Signature` header (`t=<epoch>,v1=<hex>[,...]`) against
/// the raw request body: HMAC-SHA256 of `"{t}.{body}"` with the endpoint
/// secret.
pub fn verify_signature(payload: &str, header: &str, secret: &str) -> Result<(), AppError> {
    verify_signature_at(payload, header, secret, Utc::now().timestamp())
}

fn verify_signature_at(
    payload: &str,
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), AppError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| AppError::Validation("Malformed signature header".to_string()))?;
    if signatures.is_empty() {
        return Err(AppError::Validation(
            "Malformed signature header".to_string(),
        ));
    }
    if (now - timestamp).abs() > TIMESTAMP_TOLERANCE_SECS {
        return Err(AppError::Validation(
            "Signature timestamp outside tolerance".to_string(),
        ));
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::Validation("Invalid webhook secret".to_string()))?;
    mac.update(format!("{timestamp}.{payload}").as_bytes());

    for signature in signatures {
        let Ok(bytes) = hex::decode(signature) else {
            continue;
        };
        // verify_slice is constant-time.
        if mac.clone().verify_slice(&bytes).is_ok() {
            return Ok(());
        }
    }

    Err(AppError::Validation(
        "Webhook signature mismatch".to_string(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: Value,
}

pub fn parse_event(payload: &str) -> Result<StripeEvent, AppError> {
    serde_json::from_str(payload)
        .map_err(|e| AppError::Validation(format!("Malformed webhook payload: {e}")))
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionObject {
    customer: Option<String>,
    subscription: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct InvoiceObject {
    customer: Option<String>,
}

fn epoch_to_datetime(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

/// Maps a verified Stripe event onto a domain event. Returns `None` for
/// event types this service does not consume, and for payloads missing the
/// fields an event needs (logged, acknowledged, never fatal).
///
/// `checkout.session.completed` is enriched by retrieving the subscription
/// object from Stripe, since the session payload carries neither the period
/// bounds nor the price.
pub async fn to_billing_event(
    event: &StripeEvent,
    stripe: &StripeClient,
) -> Result<Option<BillingEvent>, AppError> {
    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let session: CheckoutSessionObject = match serde_json::from_value(event.data.object.clone())
            {
                Ok(session) => session,
                Err(e) => {
                    warn!("Malformed checkout session payload: {e}");
                    return Ok(None);
                }
            };

            let Some(user_id) = session
                .metadata
                .get("userId")
                .and_then(|raw| Uuid::parse_str(raw).ok())
            else {
                warn!("No userId in checkout session metadata");
                return Ok(None);
            };
            let (Some(customer_id), Some(subscription_id)) =
                (session.customer, session.subscription)
            else {
                warn!("Checkout session missing customer or subscription id");
                return Ok(None);
            };

            let subscription = stripe.retrieve_subscription(&subscription_id).await?;

            Ok(Some(BillingEvent::CheckoutCompleted {
                user_id,
                customer_id,
                subscription_id,
                price_id: subscription.price_id(),
                period_start: epoch_to_datetime(subscription.current_period_start),
                period_end: epoch_to_datetime(subscription.current_period_end),
            }))
        }

        "customer.subscription.updated" => {
            let subscription: StripeSubscription =
                match serde_json::from_value(event.data.object.clone()) {
                    Ok(subscription) => subscription,
                    Err(e) => {
                        warn!("Malformed subscription payload: {e}");
                        return Ok(None);
                    }
                };

            Ok(Some(BillingEvent::SubscriptionUpdated {
                subscription_id: subscription.id.clone(),
                status: subscription.status.clone(),
                price_id: subscription.price_id(),
                period_start: epoch_to_datetime(subscription.current_period_start),
                period_end: epoch_to_datetime(subscription.current_period_end),
                cancel_at_period_end: subscription.cancel_at_period_end,
            }))
        }

        "customer.subscription.deleted" => {
            let Some(subscription_id) = event
                .data
                .object
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string)
            else {
                warn!("Subscription delete payload missing id");
                return Ok(None);
            };

            Ok(Some(BillingEvent::SubscriptionDeleted { subscription_id }))
        }

        "invoice.payment_failed" => {
            let invoice: InvoiceObject = match serde_json::from_value(event.data.object.clone()) {
                Ok(invoice) => invoice,
                Err(e) => {
                    warn!("Malformed invoice payload: {e}");
                    return Ok(None);
                }
            };

            let Some(customer_id) = invoice.customer else {
                warn!("Invoice payload missing customer");
                return Ok(None);
            };

            Ok(Some(BillingEvent::PaymentFailed { customer_id }))
        }

        other => {
            debug!("Unhandled webhook event type: {other}");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(payload: &str, secret: &str, timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.{payload}").as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        format!("t={timestamp},v1={signature}")
    }

    #[test]
    fn test_valid_signature_accepted() {
        let payload = r#"{"type":"invoice.payment_failed"}"#;
        let header = sign(payload, "whsec_test", 1_700_000_000);
        verify_signature_at(payload, &header, "whsec_test", 1_700_000_010).unwrap();
    }

    #[test]
    fn test_tampered_body_rejected() {
        let header = sign(r#"{"a":1}"#, "whsec_test", 1_700_000_000);
        let result = verify_signature_at(r#"{"a":2}"#, &header, "whsec_test", 1_700_000_010);
        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let payload = "body";
        let header = sign(payload, "whsec_test", 1_700_000_000);
        let result = verify_signature_at(payload, &header, "whsec_other", 1_700_000_010);
        assert!(result.is_err());
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let payload = "body";
        let header = sign(payload, "whsec_test", 1_700_000_000);
        let result = verify_signature_at(payload, &header, "whsec_test", 1_700_000_000 + 301);
        assert!(result.is_err());
    }

    #[test]
    fn test_malformed_header_rejected() {
        assert!(verify_signature_at("body", "garbage", "whsec_test", 0).is_err());
        assert!(verify_signature_at("body", "t=,v1=", "whsec_test", 0).is_err());
    }

    #[tokio::test]
    async fn test_subscription_updated_maps_fields() {
        let payload = serde_json::json!({
            "type": "customer.subscription.updated",
            "data": { "object": {
                "id": "sub_123",
                "status": "past_due",
                "customer": "cus_123",
                "cancel_at_period_end": true,
                "current_period_start": 1_700_000_000,
                "current_period_end": 1_702_592_000,
                "items": { "data": [ { "price": { "id": "price_123" } } ] }
            }}
        });
        let event = parse_event(&payload.to_string()).unwrap();
        let stripe = StripeClient::new("sk_test".to_string());

        let mapped = to_billing_event(&event, &stripe).await.unwrap().unwrap();
        match mapped {
            BillingEvent::SubscriptionUpdated {
                subscription_id,
                status,
                price_id,
                cancel_at_period_end,
                ..
            } => {
                assert_eq!(subscription_id, "sub_123");
                assert_eq!(status, "past_due");
                assert_eq!(price_id.as_deref(), Some("price_123"));
                assert!(cancel_at_period_end);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unhandled_event_type_maps_to_none() {
        let payload = serde_json::json!({
            "type": "customer.created",
            "data": { "object": {} }
        });
        let event = parse_event(&payload.to_string()).unwrap();
        let stripe = StripeClient::new("sk_test".to_string());

        assert!(to_billing_event(&event, &stripe).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_payment_failed_maps_customer() {
        let payload = serde_json::json!({
            "type": "invoice.payment_failed",
            "data": { "object": { "customer": "cus_42" } }
        });
        let event = parse_event(&payload.to_string()).unwrap();
        let stripe = StripeClient::new("sk_test".to_string());

        let mapped = to_billing_event(&event, &stripe).await.unwrap().unwrap();
        assert!(
            matches!(mapped, BillingEvent::PaymentFailed { customer_id } if customer_id == "cus_42")
        );
    }
}
