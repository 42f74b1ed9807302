use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::subscription::Subscription;
use crate::plans::Feature;
use crate::store::SubscriptionStore;

/// Mutex-guarded map. The lock makes `increment_usage` atomic, matching
/// the ceiling semantics of the Postgres UPDATE.
#[derive(Default)]
pub struct InMemorySubscriptionStore {
    records: Mutex<HashMap<Uuid, Subscription>>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test helper: seed a record directly.
    pub fn seed(&self, subscription: Subscription) {
        self.records
            .lock()
            .unwrap()
            .insert(subscription.user_id, subscription);
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Subscription>, AppError> {
        Ok(self.records.lock().unwrap().get(&user_id).cloned())
    }

    async fn find_by_stripe_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Subscription>, AppError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .find(|s| s.stripe_subscription_id.as_deref() == Some(subscription_id))
            .cloned())
    }

    async fn find_by_stripe_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<Subscription>, AppError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .find(|s| s.stripe_customer_id.as_deref() == Some(customer_id))
            .cloned())
    }

    async fn create_default(&self, user_id: Uuid) -> Result<Subscription, AppError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .entry(user_id)
            .or_insert_with(|| Subscription::new_free(user_id, Utc::now()));
        Ok(record.clone())
    }

    async fn save(&self, subscription: &Subscription) -> Result<(), AppError> {
        let mut records = self.records.lock().unwrap();
        match records.get_mut(&subscription.user_id) {
            Some(existing) => {
                // Mirrors the Postgres UPDATE: counters are not overwritten.
                let usage = existing.usage;
                *existing = subscription.clone();
                existing.usage = usage;
                existing.updated_at = Utc::now();
            }
            None => {
                records.insert(subscription.user_id, subscription.clone());
            }
        }
        Ok(())
    }

    async fn reset_usage(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<(), AppError> {
        let mut records = self.records.lock().unwrap();
        if let Some(record) = records.get_mut(&user_id) {
            record.usage = crate::models::subscription::UsageCounters::zeroed(now);
            record.updated_at = now;
        }
        Ok(())
    }

    async fn increment_usage(
        &self,
        user_id: Uuid,
        feature: Feature,
        ceiling: u32,
    ) -> Result<bool, AppError> {
        let mut records = self.records.lock().unwrap();
        let Some(record) = records.get_mut(&user_id) else {
            return Ok(false);
        };
        let counter = record.usage.count_for_mut(feature);
        if *counter >= ceiling {
            return Ok(false);
        }
        *counter += 1;
        record.updated_at = Utc::now();
        Ok(true)
    }
}
