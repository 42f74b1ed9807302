use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::plans::{Feature, PlanTier};

/// Billing status mirrored from the payment processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Canceled,
    PastDue,
    Trialing,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Trialing => "trialing",
        }
    }

    /// Maps a raw Stripe subscription status onto the local enum.
    /// `unpaid` has no local slot and is folded into `canceled`;
    /// anything unrecognized is treated as `active` (last known good).
    pub fn from_processor(raw: &str) -> Self {
        match raw {
            "canceled" | "unpaid" => SubscriptionStatus::Canceled,
            "past_due" => SubscriptionStatus::PastDue,
            "trialing" => SubscriptionStatus::Trialing,
            _ => SubscriptionStatus::Active,
        }
    }
}

/// Monthly usage counter bundle. Counters only move up within a calendar
/// month; they reset to zero when the wall-clock month rolls over past
/// `last_reset_date`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageCounters {
    pub ats_checks: u32,
    pub ai_tailors: u32,
    pub resumes: u32,
    pub portfolios: u32,
    pub last_reset_date: DateTime<Utc>,
}

impl UsageCounters {
    pub fn zeroed(now: DateTime<Utc>) -> Self {
        Self {
            ats_checks: 0,
            ai_tailors: 0,
            resumes: 0,
            portfolios: 0,
            last_reset_date: now,
        }
    }

    pub fn count_for(&self, feature: Feature) -> u32 {
        match feature {
            Feature::AtsChecks => self.ats_checks,
            Feature::AiTailors => self.ai_tailors,
            Feature::Resumes => self.resumes,
            Feature::Portfolios => self.portfolios,
        }
    }

    pub fn count_for_mut(&mut self, feature: Feature) -> &mut u32 {
        match feature {
            Feature::AtsChecks => &mut self.ats_checks,
            Feature::AiTailors => &mut self.ai_tailors,
            Feature::Resumes => &mut self.resumes,
            Feature::Portfolios => &mut self.portfolios,
        }
    }
}

/// One subscription record per user. Created lazily on first touch, never
/// deleted; a canceled paid plan reverts to `free` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub user_id: Uuid,
    pub plan: PlanTier,
    pub status: SubscriptionStatus,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub stripe_price_id: Option<String>,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub usage: UsageCounters,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Default record for a user seen for the first time.
    pub fn new_free(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            plan: PlanTier::Free,
            status: SubscriptionStatus::Active,
            stripe_customer_id: None,
            stripe_subscription_id: None,
            stripe_price_id: None,
            current_period_start: None,
            current_period_end: None,
            cancel_at_period_end: false,
            usage: UsageCounters::zeroed(now),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processor_status_mapping() {
        assert_eq!(
            SubscriptionStatus::from_processor("unpaid"),
            SubscriptionStatus::Canceled
        );
        assert_eq!(
            SubscriptionStatus::from_processor("canceled"),
            SubscriptionStatus::Canceled
        );
        assert_eq!(
            SubscriptionStatus::from_processor("past_due"),
            SubscriptionStatus::PastDue
        );
        assert_eq!(
            SubscriptionStatus::from_processor("trialing"),
            SubscriptionStatus::Trialing
        );
        assert_eq!(
            SubscriptionStatus::from_processor("active"),
            SubscriptionStatus::Active
        );
    }
}
