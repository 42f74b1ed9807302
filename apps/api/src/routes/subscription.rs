//! Plan catalog and the caller-facing subscription summary.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::metering;
use crate::models::subscription::{SubscriptionStatus, UsageCounters};
use crate::plans::{self, limits_for, PlanInfo, PlanLimits, PlanTier};
use crate::state::AppState;

/// GET /api/v1/plans
pub async fn handle_list_plans() -> Json<Vec<PlanInfo>> {
    Json(plans::catalog())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSummary {
    pub plan: PlanTier,
    pub status: SubscriptionStatus,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub usage: UsageCounters,
    pub limits: PlanLimits,
}

/// GET /api/v1/subscription
///
/// Reading the summary goes through `get_or_create_subscription`, so the
/// lazy month reset applies before the counters are reported.
pub async fn handle_get_subscription(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<SubscriptionSummary>, AppError> {
    let subscription =
        metering::get_or_create_subscription(state.subscriptions.as_ref(), user_id).await?;

    Ok(Json(SubscriptionSummary {
        plan: subscription.plan,
        status: subscription.status,
        current_period_end: subscription.current_period_end,
        cancel_at_period_end: subscription.cancel_at_period_end,
        usage: subscription.usage,
        limits: limits_for(subscription.plan),
    }))
}
