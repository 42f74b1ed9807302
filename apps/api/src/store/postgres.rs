use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::subscription::{Subscription, SubscriptionStatus, UsageCounters};
use crate::plans::{Feature, PlanTier};
use crate::store::SubscriptionStore;

/// sqlx-backed store. Counter updates are done with SQL arithmetic rather
/// than read-modify-write, so they cannot clobber concurrent billing-event
/// writes to the same row.
pub struct PgSubscriptionStore {
    pool: PgPool,
}

impl PgSubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Raw row shape; plan/status are TEXT in the database and mapped onto the
/// closed enums at this boundary.
#[derive(Debug, FromRow)]
struct SubscriptionRecord {
    user_id: Uuid,
    plan: String,
    status: String,
    stripe_customer_id: Option<String>,
    stripe_subscription_id: Option<String>,
    stripe_price_id: Option<String>,
    current_period_start: Option<DateTime<Utc>>,
    current_period_end: Option<DateTime<Utc>>,
    cancel_at_period_end: bool,
    usage_ats_checks: i32,
    usage_ai_tailors: i32,
    usage_resumes: i32,
    usage_portfolios: i32,
    usage_last_reset: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SubscriptionRecord> for Subscription {
    fn from(r: SubscriptionRecord) -> Self {
        Subscription {
            user_id: r.user_id,
            plan: PlanTier::from_str_or_free(&r.plan),
            status: SubscriptionStatus::from_processor(&r.status),
            stripe_customer_id: r.stripe_customer_id,
            stripe_subscription_id: r.stripe_subscription_id,
            stripe_price_id: r.stripe_price_id,
            current_period_start: r.current_period_start,
            current_period_end: r.current_period_end,
            cancel_at_period_end: r.cancel_at_period_end,
            usage: UsageCounters {
                ats_checks: r.usage_ats_checks.max(0) as u32,
                ai_tailors: r.usage_ai_tailors.max(0) as u32,
                resumes: r.usage_resumes.max(0) as u32,
                portfolios: r.usage_portfolios.max(0) as u32,
                last_reset_date: r.usage_last_reset,
            },
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

const SELECT_COLUMNS: &str = "user_id, plan, status, stripe_customer_id, \
     stripe_subscription_id, stripe_price_id, current_period_start, \
     current_period_end, cancel_at_period_end, usage_ats_checks, \
     usage_ai_tailors, usage_resumes, usage_portfolios, usage_last_reset, \
     created_at, updated_at";

fn counter_column(feature: Feature) -> &'static str {
    match feature {
        Feature::AtsChecks => "usage_ats_checks",
        Feature::AiTailors => "usage_ai_tailors",
        Feature::Resumes => "usage_resumes",
        Feature::Portfolios => "usage_portfolios",
    }
}

#[async_trait]
impl SubscriptionStore for PgSubscriptionStore {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Subscription>, AppError> {
        let record: Option<SubscriptionRecord> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM subscriptions WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Subscription::from))
    }

    async fn find_by_stripe_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Subscription>, AppError> {
        let record: Option<SubscriptionRecord> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM subscriptions WHERE stripe_subscription_id = $1"
        ))
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Subscription::from))
    }

    async fn find_by_stripe_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<Subscription>, AppError> {
        let record: Option<SubscriptionRecord> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM subscriptions WHERE stripe_customer_id = $1"
        ))
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Subscription::from))
    }

    async fn create_default(&self, user_id: Uuid) -> Result<Subscription, AppError> {
        // Insert-if-absent; a concurrent first touch for the same user is
        // resolved by the conflict clause, and both callers read the winner.
        sqlx::query(
            "INSERT INTO subscriptions (user_id) VALUES ($1) \
             ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        let record: SubscriptionRecord = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM subscriptions WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(record.into())
    }

    async fn save(&self, subscription: &Subscription) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE subscriptions SET
                plan = $2,
                status = $3,
                stripe_customer_id = $4,
                stripe_subscription_id = $5,
                stripe_price_id = $6,
                current_period_start = $7,
                current_period_end = $8,
                cancel_at_period_end = $9,
                updated_at = now()
            WHERE user_id = $1
            "#,
        )
        .bind(subscription.user_id)
        .bind(subscription.plan.as_str())
        .bind(subscription.status.as_str())
        .bind(&subscription.stripe_customer_id)
        .bind(&subscription.stripe_subscription_id)
        .bind(&subscription.stripe_price_id)
        .bind(subscription.current_period_start)
        .bind(subscription.current_period_end)
        .bind(subscription.cancel_at_period_end)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn reset_usage(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE subscriptions SET
                usage_ats_checks = 0,
                usage_ai_tailors = 0,
                usage_resumes = 0,
                usage_portfolios = 0,
                usage_last_reset = $2,
                updated_at = now()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn increment_usage(
        &self,
        user_id: Uuid,
        feature: Feature,
        ceiling: u32,
    ) -> Result<bool, AppError> {
        let column = counter_column(feature);
        let result = sqlx::query(&format!(
            "UPDATE subscriptions \
             SET {column} = {column} + 1, updated_at = now() \
             WHERE user_id = $1 AND {column} < $2"
        ))
        .bind(user_id)
        .bind(ceiling as i32)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
