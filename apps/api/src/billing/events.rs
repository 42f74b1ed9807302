//! Domain billing events and the state machine they drive over
//! `{plan, status}`. Events arrive already verified; unmatched lookups are
//! logged and ignored; Stripe's own retry policy is the safety net.

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::subscription::SubscriptionStatus;
use crate::plans::PlanTier;
use crate::store::SubscriptionStore;

#[derive(Debug, Clone)]
pub enum BillingEvent {
    /// A paid checkout finished. Identifiers and period bounds come from the
    /// subscription object the webhook layer retrieved from Stripe.
    CheckoutCompleted {
        user_id: Uuid,
        customer_id: String,
        subscription_id: String,
        price_id: Option<String>,
        period_start: Option<DateTime<Utc>>,
        period_end: Option<DateTime<Utc>>,
    },
    /// Processor-side subscription change. `status` is Stripe's raw status
    /// string; `canceled` and `unpaid` force the plan back to free.
    SubscriptionUpdated {
        subscription_id: String,
        status: String,
        price_id: Option<String>,
        period_start: Option<DateTime<Utc>>,
        period_end: Option<DateTime<Utc>>,
        cancel_at_period_end: bool,
    },
    SubscriptionDeleted {
        subscription_id: String,
    },
    PaymentFailed {
        customer_id: String,
    },
}

pub async fn handle_event(
    store: &dyn SubscriptionStore,
    event: BillingEvent,
) -> Result<(), AppError> {
    match event {
        BillingEvent::CheckoutCompleted {
            user_id,
            customer_id,
            subscription_id,
            price_id,
            period_start,
            period_end,
        } => {
            // A user can complete checkout before any metered request has
            // lazily created their record; create it rather than drop a
            // paid activation.
            let mut subscription = match store.find_by_user(user_id).await? {
                Some(subscription) => subscription,
                None => store.create_default(user_id).await?,
            };

            subscription.plan = PlanTier::Pro;
            subscription.status = SubscriptionStatus::Active;
            subscription.stripe_customer_id = Some(customer_id);
            subscription.stripe_subscription_id = Some(subscription_id);
            subscription.stripe_price_id = price_id;
            subscription.current_period_start = period_start;
            subscription.current_period_end = period_end;
            subscription.cancel_at_period_end = false;
            store.save(&subscription).await?;

            info!("Subscription activated for user {user_id}");
        }

        BillingEvent::SubscriptionUpdated {
            subscription_id,
            status,
            price_id,
            period_start,
            period_end,
            cancel_at_period_end,
        } => {
            let Some(mut subscription) =
                store.find_by_stripe_subscription(&subscription_id).await?
            else {
                warn!("No subscription matching {subscription_id}; ignoring update event");
                return Ok(());
            };

            subscription.status = SubscriptionStatus::from_processor(&status);
            subscription.stripe_price_id = price_id;
            subscription.current_period_start = period_start;
            subscription.current_period_end = period_end;
            subscription.cancel_at_period_end = cancel_at_period_end;
            if status == "canceled" || status == "unpaid" {
                subscription.plan = PlanTier::Free;
            }
            store.save(&subscription).await?;

            info!("Subscription updated: {subscription_id}");
        }

        BillingEvent::SubscriptionDeleted { subscription_id } => {
            let Some(mut subscription) =
                store.find_by_stripe_subscription(&subscription_id).await?
            else {
                warn!("No subscription matching {subscription_id}; ignoring delete event");
                return Ok(());
            };

            subscription.plan = PlanTier::Free;
            subscription.status = SubscriptionStatus::Canceled;
            subscription.stripe_subscription_id = None;
            subscription.stripe_price_id = None;
            subscription.current_period_end = None;
            store.save(&subscription).await?;

            info!("Subscription canceled: {subscription_id}");
        }

        BillingEvent::PaymentFailed { customer_id } => {
            let Some(mut subscription) = store.find_by_stripe_customer(&customer_id).await?
            else {
                warn!("No subscription for customer {customer_id}; ignoring payment failure");
                return Ok(());
            };

            subscription.status = SubscriptionStatus::PastDue;
            store.save(&subscription).await?;

            warn!("Payment failed for customer {customer_id}; marked past_due");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::subscription::Subscription;
    use crate::store::memory::InMemorySubscriptionStore;

    fn pro_subscription(user_id: Uuid) -> Subscription {
        let mut subscription = Subscription::new_free(user_id, Utc::now());
        subscription.plan = PlanTier::Pro;
        subscription.status = SubscriptionStatus::Active;
        subscription.stripe_customer_id = Some("cus_123".to_string());
        subscription.stripe_subscription_id = Some("sub_123".to_string());
        subscription.stripe_price_id = Some("price_123".to_string());
        subscription.current_period_end = Some(Utc::now());
        subscription
    }

    #[tokio::test]
    async fn test_checkout_completed_upgrades_to_pro() {
        let store = InMemorySubscriptionStore::new();
        let user_id = Uuid::new_v4();
        store.seed(Subscription::new_free(user_id, Utc::now()));

        handle_event(
            &store,
            BillingEvent::CheckoutCompleted {
                user_id,
                customer_id: "cus_123".to_string(),
                subscription_id: "sub_123".to_string(),
                price_id: Some("price_123".to_string()),
                period_start: Some(Utc::now()),
                period_end: Some(Utc::now()),
            },
        )
        .await
        .unwrap();

        let subscription = store.find_by_user(user_id).await.unwrap().unwrap();
        assert_eq!(subscription.plan, PlanTier::Pro);
        assert_eq!(subscription.status, SubscriptionStatus::Active);
        assert_eq!(subscription.stripe_customer_id.as_deref(), Some("cus_123"));
        assert!(!subscription.cancel_at_period_end);
    }

    #[tokio::test]
    async fn test_checkout_completed_creates_missing_record() {
        let store = InMemorySubscriptionStore::new();
        let user_id = Uuid::new_v4();

        handle_event(
            &store,
            BillingEvent::CheckoutCompleted {
                user_id,
                customer_id: "cus_new".to_string(),
                subscription_id: "sub_new".to_string(),
                price_id: None,
                period_start: None,
                period_end: None,
            },
        )
        .await
        .unwrap();

        let subscription = store.find_by_user(user_id).await.unwrap().unwrap();
        assert_eq!(subscription.plan, PlanTier::Pro);
    }

    #[tokio::test]
    async fn test_subscription_deleted_reverts_to_free() {
        let store = InMemorySubscriptionStore::new();
        let user_id = Uuid::new_v4();
        store.seed(pro_subscription(user_id));

        handle_event(
            &store,
            BillingEvent::SubscriptionDeleted {
                subscription_id: "sub_123".to_string(),
            },
        )
        .await
        .unwrap();

        let subscription = store.find_by_user(user_id).await.unwrap().unwrap();
        assert_eq!(subscription.plan, PlanTier::Free);
        assert_eq!(subscription.status, SubscriptionStatus::Canceled);
        assert!(subscription.stripe_subscription_id.is_none());
        assert!(subscription.stripe_price_id.is_none());
        assert!(subscription.current_period_end.is_none());
        // Customer id survives so the user can resubscribe.
        assert_eq!(subscription.stripe_customer_id.as_deref(), Some("cus_123"));
    }

    #[tokio::test]
    async fn test_unpaid_status_forces_free_plan() {
        let store = InMemorySubscriptionStore::new();
        let user_id = Uuid::new_v4();
        store.seed(pro_subscription(user_id));

        handle_event(
            &store,
            BillingEvent::SubscriptionUpdated {
                subscription_id: "sub_123".to_string(),
                status: "unpaid".to_string(),
                price_id: Some("price_123".to_string()),
                period_start: None,
                period_end: None,
                cancel_at_period_end: true,
            },
        )
        .await
        .unwrap();

        let subscription = store.find_by_user(user_id).await.unwrap().unwrap();
        assert_eq!(subscription.plan, PlanTier::Free);
        assert_eq!(subscription.status, SubscriptionStatus::Canceled);
        assert!(subscription.cancel_at_period_end);
    }

    #[tokio::test]
    async fn test_update_with_active_status_keeps_plan() {
        let store = InMemorySubscriptionStore::new();
        let user_id = Uuid::new_v4();
        store.seed(pro_subscription(user_id));

        handle_event(
            &store,
            BillingEvent::SubscriptionUpdated {
                subscription_id: "sub_123".to_string(),
                status: "active".to_string(),
                price_id: Some("price_456".to_string()),
                period_start: Some(Utc::now()),
                period_end: Some(Utc::now()),
                cancel_at_period_end: false,
            },
        )
        .await
        .unwrap();

        let subscription = store.find_by_user(user_id).await.unwrap().unwrap();
        assert_eq!(subscription.plan, PlanTier::Pro);
        assert_eq!(subscription.stripe_price_id.as_deref(), Some("price_456"));
    }

    #[tokio::test]
    async fn test_payment_failed_marks_past_due() {
        let store = InMemorySubscriptionStore::new();
        let user_id = Uuid::new_v4();
        store.seed(pro_subscription(user_id));

        handle_event(
            &store,
            BillingEvent::PaymentFailed {
                customer_id: "cus_123".to_string(),
            },
        )
        .await
        .unwrap();

        let subscription = store.find_by_user(user_id).await.unwrap().unwrap();
        assert_eq!(subscription.status, SubscriptionStatus::PastDue);
        assert_eq!(subscription.plan, PlanTier::Pro);
    }

    #[tokio::test]
    async fn test_unmatched_events_are_ignored() {
        let store = InMemorySubscriptionStore::new();

        handle_event(
            &store,
            BillingEvent::SubscriptionDeleted {
                subscription_id: "sub_ghost".to_string(),
            },
        )
        .await
        .unwrap();

        handle_event(
            &store,
            BillingEvent::PaymentFailed {
                customer_id: "cus_ghost".to_string(),
            },
        )
        .await
        .unwrap();
    }
}
