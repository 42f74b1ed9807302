//! ATS check: score resume/job-description alignment.
//!
//! Accepts either JSON (`resumeText` + `jobDescription`) or multipart form
//! data with an optional `resumeFile` PDF whose extracted text is appended
//! to any pasted `resumeText`.

use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::header::CONTENT_TYPE,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ai::AtsAnalysis;
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::metering;
use crate::pdf;
use crate::plans::Feature;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtsRequest {
    #[serde(default)]
    pub resume_text: String,
    #[serde(default)]
    pub job_description: String,
}

#[derive(Debug, Serialize)]
pub struct AtsResponse {
    pub analysis: AtsAnalysis,
}

/// POST /api/v1/ats
pub async fn handle_ats_check(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    request: Request,
) -> Result<Json<AtsResponse>, AppError> {
    metering::check_usage_limit(state.subscriptions.as_ref(), user_id, Feature::AtsChecks)
        .await?
        .require(Feature::AtsChecks)?;

    let (resume_text, job_description) = read_inputs(&state, request).await?;

    let analysis = state
        .ai
        .generate_ats_analysis(&resume_text, &job_description)
        .await?;

    debug!("ATS analysis complete, match score {}", analysis.match_score);

    metering::increment_usage(state.subscriptions.as_ref(), user_id, Feature::AtsChecks).await?;

    Ok(Json(AtsResponse { analysis }))
}

async fn read_inputs(state: &AppState, request: Request) -> Result<(String, String), AppError> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("multipart/form-data"))
        .unwrap_or(false);

    if !is_multipart {
        let Json(body): Json<AtsRequest> = Json::from_request(request, state)
            .await
            .map_err(|e| AppError::Validation(format!("Invalid JSON body: {e}")))?;
        return Ok((body.resume_text, body.job_description));
    }

    let mut multipart = Multipart::from_request(request, state)
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?;

    let mut resume_text = String::new();
    let mut job_description = String::new();
    let mut pdf_text = String::new();
    let mut had_file = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("resumeFile") => {
                had_file = true;
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
                pdf_text = pdf::extract_text(&bytes);
            }
            Some("resumeText") => {
                resume_text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid field: {e}")))?;
            }
            Some("jobDescription") => {
                job_description = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid field: {e}")))?;
            }
            _ => {}
        }
    }

    let combined = [resume_text.trim(), pdf_text.trim()]
        .iter()
        .filter(|part| !part.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join("\n\n");

    if had_file && combined.is_empty() {
        return Err(AppError::Validation(
            "Couldn't extract text from the uploaded PDF. Try another file or paste the \
             resume text instead."
                .to_string(),
        ));
    }

    Ok((combined, job_description))
}
