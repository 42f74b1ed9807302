//! Subscription persistence: trait-based so the metering and billing cores
//! are testable without a database.
//!
//! `AppState` holds an `Arc<dyn SubscriptionStore>`: `PgSubscriptionStore`
//! in production, `InMemorySubscriptionStore` in tests and local dev.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::subscription::Subscription;
use crate::plans::Feature;

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Subscription>, AppError>;

    async fn find_by_stripe_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Subscription>, AppError>;

    async fn find_by_stripe_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<Subscription>, AppError>;

    /// Inserts the default free record if the user has none.
    /// Returns the stored record either way.
    async fn create_default(&self, user_id: Uuid) -> Result<Subscription, AppError>;

    /// Overwrites the record's mutable fields (plan, status, billing
    /// identifiers, period bounds, cancel flag). Does not touch counters.
    async fn save(&self, subscription: &Subscription) -> Result<(), AppError>;

    /// Zeroes all four usage counters and stamps `last_reset_date`.
    async fn reset_usage(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<(), AppError>;

    /// Atomic conditional increment: adds 1 to the feature's counter only
    /// while it is strictly below `ceiling`. Returns whether the increment
    /// was applied. Concurrent callers can never push a counter past the
    /// ceiling.
    async fn increment_usage(
        &self,
        user_id: Uuid,
        feature: Feature,
        ceiling: u32,
    ) -> Result<bool, AppError>;
}
