//! AI tailoring: rewrite resume content against a job description.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::metering;
use crate::plans::Feature;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TailorRequest {
    pub resume_text: String,
    pub job_description: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TailorResponse {
    pub suggestion: String,
    pub suggested_template: &'static str,
}

/// POST /api/v1/tailor
pub async fn handle_tailor(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(request): Json<TailorRequest>,
) -> Result<Json<TailorResponse>, AppError> {
    metering::check_usage_limit(state.subscriptions.as_ref(), user_id, Feature::AiTailors)
        .await?
        .require(Feature::AiTailors)?;

    let suggestion = state
        .ai
        .generate_tailored_content(&request.resume_text, &request.job_description)
        .await?;

    let suggested_template = suggest_template(&request.job_description);

    metering::increment_usage(state.subscriptions.as_ref(), user_id, Feature::AiTailors).await?;

    Ok(Json(TailorResponse {
        suggestion,
        suggested_template,
    }))
}

/// Coarse keyword heuristic mapping a job description onto one of the three
/// resume templates.
fn suggest_template(job_description: &str) -> &'static str {
    let jd = job_description.to_lowercase();
    if ["bank", "finance", "legal", "consultant"]
        .iter()
        .any(|kw| jd.contains(kw))
    {
        "classic"
    } else if ["designer", "creative", "artist", "ux", "ui"]
        .iter()
        .any(|kw| jd.contains(kw))
    {
        "minimal"
    } else {
        "modern"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finance_roles_get_classic() {
        assert_eq!(suggest_template("Investment bank analyst"), "classic");
    }

    #[test]
    fn test_design_roles_get_minimal() {
        assert_eq!(suggest_template("Senior UX Designer"), "minimal");
    }

    #[test]
    fn test_default_is_modern() {
        assert_eq!(suggest_template("Backend engineer, Rust"), "modern");
    }
}
