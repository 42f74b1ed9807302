//! Usage metering: plan-gated feature counting.
//!
//! Flow on a metered route: `check_usage_limit` → run the feature's business
//! logic → `increment_usage` only after it succeeds. Incrementing first would
//! undercount on failure; incrementing unconditionally would overcount.
//!
//! The month reset is lazy: `get_or_create_subscription` normalizes counters
//! on read when the wall-clock month has rolled past `last_reset_date`.
//! There is no scheduled job; callers rely on the reset happening
//! synchronously before the counters they immediately read.

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::subscription::Subscription;
use crate::plans::{limits_for, Feature, PlanTier};
use crate::store::SubscriptionStore;

/// Result of a usage check. `allowed` is strict: `current == limit` denies,
/// so a limit of 3 permits exactly 3 successful uses.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct UsageCheck {
    pub allowed: bool,
    pub current: u32,
    pub limit: u32,
    pub plan: PlanTier,
}

impl UsageCheck {
    /// Converts a denied check into the structured 403 error.
    pub fn require(self, feature: Feature) -> Result<(), AppError> {
        if self.allowed {
            Ok(())
        } else {
            Err(AppError::LimitReached {
                feature,
                current: self.current,
                limit: self.limit,
                plan: self.plan,
            })
        }
    }
}

fn month_rolled_over(last_reset: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    last_reset.year() != now.year() || last_reset.month() != now.month()
}

/// Fetches the user's subscription, creating the default free record on
/// first touch, then applies the lazy month-rollover reset.
pub async fn get_or_create_subscription(
    store: &dyn SubscriptionStore,
    user_id: Uuid,
) -> Result<Subscription, AppError> {
    let mut subscription = match store.find_by_user(user_id).await? {
        Some(subscription) => subscription,
        None => {
            info!("Creating default free subscription for user {user_id}");
            store.create_default(user_id).await?
        }
    };

    let now = Utc::now();
    if month_rolled_over(subscription.usage.last_reset_date, now) {
        info!("Monthly usage reset for user {user_id}");
        store.reset_usage(user_id, now).await?;
        subscription.usage = crate::models::subscription::UsageCounters::zeroed(now);
    }

    Ok(subscription)
}

/// Read-only check of one feature against the user's plan limit.
pub async fn check_usage_limit(
    store: &dyn SubscriptionStore,
    user_id: Uuid,
    feature: Feature,
) -> Result<UsageCheck, AppError> {
    let subscription = get_or_create_subscription(store, user_id).await?;
    let limit = limits_for(subscription.plan).limit_for(feature);
    let current = subscription.usage.count_for(feature);

    Ok(UsageCheck {
        allowed: current < limit,
        current,
        limit,
        plan: subscription.plan,
    })
}

/// Increments the feature's counter by one. Must be called only after the
/// gated operation succeeds. The store-level increment carries the plan
/// limit as a ceiling, so a racing pair of requests at `limit - 1` cannot
/// push the counter past the limit.
pub async fn increment_usage(
    store: &dyn SubscriptionStore,
    user_id: Uuid,
    feature: Feature,
) -> Result<(), AppError> {
    let subscription = get_or_create_subscription(store, user_id).await?;
    let ceiling = limits_for(subscription.plan).limit_for(feature);

    let applied = store.increment_usage(user_id, feature, ceiling).await?;
    if !applied {
        // The check passed earlier but a concurrent request consumed the
        // last slot. The operation already ran; the counter stays clamped.
        warn!("Usage increment clamped at ceiling for user {user_id} ({feature})");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;

    use super::*;
    use crate::models::subscription::SubscriptionStatus;
    use crate::store::memory::InMemorySubscriptionStore;

    fn seeded_store(user_id: Uuid, mutate: impl FnOnce(&mut Subscription)) -> InMemorySubscriptionStore {
        let store = InMemorySubscriptionStore::new();
        let mut subscription = Subscription::new_free(user_id, Utc::now());
        mutate(&mut subscription);
        store.seed(subscription);
        store
    }

    #[tokio::test]
    async fn test_first_touch_creates_free_subscription() {
        let store = InMemorySubscriptionStore::new();
        let user_id = Uuid::new_v4();

        let subscription = get_or_create_subscription(&store, user_id).await.unwrap();

        assert_eq!(subscription.plan, PlanTier::Free);
        assert_eq!(subscription.status, SubscriptionStatus::Active);
        assert_eq!(subscription.usage.ats_checks, 0);
        assert!(store.find_by_user(user_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_allowed_is_strictly_below_limit() {
        let user_id = Uuid::new_v4();

        // Free plan: 3 ATS checks. At 2, allowed; at 3, denied.
        let store = seeded_store(user_id, |s| s.usage.ats_checks = 2);
        let check = check_usage_limit(&store, user_id, Feature::AtsChecks)
            .await
            .unwrap();
        assert!(check.allowed);
        assert_eq!((check.current, check.limit), (2, 3));

        let store = seeded_store(user_id, |s| s.usage.ats_checks = 3);
        let check = check_usage_limit(&store, user_id, Feature::AtsChecks)
            .await
            .unwrap();
        assert!(!check.allowed);
        assert_eq!((check.current, check.limit), (3, 3));
    }

    #[tokio::test]
    async fn test_denied_check_maps_to_limit_reached() {
        let user_id = Uuid::new_v4();
        let store = seeded_store(user_id, |s| s.usage.resumes = 2);

        let check = check_usage_limit(&store, user_id, Feature::Resumes)
            .await
            .unwrap();
        let err = check.require(Feature::Resumes).unwrap_err();

        match err {
            AppError::LimitReached {
                feature,
                current,
                limit,
                plan,
            } => {
                assert_eq!(feature, Feature::Resumes);
                assert_eq!(current, 2);
                assert_eq!(limit, 2);
                assert_eq!(plan, PlanTier::Free);
            }
            other => panic!("expected LimitReached, got {other:?}"),
        }

        // Denied checks never mutate state.
        let after = store.find_by_user(user_id).await.unwrap().unwrap();
        assert_eq!(after.usage.resumes, 2);
    }

    #[tokio::test]
    async fn test_increment_moves_only_the_named_counter() {
        let user_id = Uuid::new_v4();
        let store = seeded_store(user_id, |s| s.plan = PlanTier::Pro);

        for _ in 0..4 {
            increment_usage(&store, user_id, Feature::AtsChecks)
                .await
                .unwrap();
        }

        let subscription = store.find_by_user(user_id).await.unwrap().unwrap();
        assert_eq!(subscription.usage.ats_checks, 4);
        assert_eq!(subscription.usage.ai_tailors, 0);
        assert_eq!(subscription.usage.resumes, 0);
        assert_eq!(subscription.usage.portfolios, 0);
    }

    #[tokio::test]
    async fn test_month_rollover_resets_counters_once() {
        let user_id = Uuid::new_v4();
        let last_month = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let store = seeded_store(user_id, |s| {
            s.usage.ats_checks = 3;
            s.usage.ai_tailors = 2;
            s.usage.resumes = 1;
            s.usage.portfolios = 1;
            s.usage.last_reset_date = last_month;
        });

        let subscription = get_or_create_subscription(&store, user_id).await.unwrap();
        assert_eq!(subscription.usage.ats_checks, 0);
        assert_eq!(subscription.usage.ai_tailors, 0);
        assert_eq!(subscription.usage.resumes, 0);
        assert_eq!(subscription.usage.portfolios, 0);

        // A later usage in the same month must survive the next read.
        increment_usage(&store, user_id, Feature::AtsChecks)
            .await
            .unwrap();
        let subscription = get_or_create_subscription(&store, user_id).await.unwrap();
        assert_eq!(subscription.usage.ats_checks, 1);
    }

    #[tokio::test]
    async fn test_same_month_never_resets() {
        assert!(!month_rolled_over(Utc::now(), Utc::now()));
        assert!(month_rolled_over(
            Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
        ));
        // Same month, different year still resets.
        assert!(month_rolled_over(
            Utc.with_ymd_and_hms(2023, 3, 5, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap(),
        ));
    }

    #[tokio::test]
    async fn test_racing_increments_never_exceed_limit() {
        let user_id = Uuid::new_v4();
        // Free plan portfolios limit is 1; start one below it.
        let store = Arc::new(seeded_store(user_id, |s| s.usage.portfolios = 0));

        let a = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let check = check_usage_limit(store.as_ref(), user_id, Feature::Portfolios)
                    .await
                    .unwrap();
                if check.allowed {
                    increment_usage(store.as_ref(), user_id, Feature::Portfolios)
                        .await
                        .unwrap();
                }
            })
        };
        let b = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let check = check_usage_limit(store.as_ref(), user_id, Feature::Portfolios)
                    .await
                    .unwrap();
                if check.allowed {
                    increment_usage(store.as_ref(), user_id, Feature::Portfolios)
                        .await
                        .unwrap();
                }
            })
        };
        let (ra, rb) = tokio::join!(a, b);
        ra.unwrap();
        rb.unwrap();

        let subscription = store.find_by_user(user_id).await.unwrap().unwrap();
        let limit = limits_for(subscription.plan).limit_for(Feature::Portfolios);
        assert!(subscription.usage.portfolios <= limit);
    }
}
