//! Resume CRUD. Creation is plan-gated; reads, updates, and deletes are not.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::metering;
use crate::models::resume::{default_resume_content, ResumeRow};
use crate::plans::Feature;
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateResumeRequest {
    pub title: Option<String>,
}

/// POST /api/v1/resumes
pub async fn handle_create(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    body: Option<Json<CreateResumeRequest>>,
) -> Result<(StatusCode, Json<ResumeRow>), AppError> {
    metering::check_usage_limit(state.subscriptions.as_ref(), user_id, Feature::Resumes)
        .await?
        .require(Feature::Resumes)?;

    let title = body
        .and_then(|Json(b)| b.title)
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| "Untitled Resume".to_string());

    let resume: ResumeRow = sqlx::query_as(
        r#"
        INSERT INTO resumes (user_id, title, content)
        VALUES ($1, $2, $3)
        RETURNING id, user_id, title, template, content, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(title)
    .bind(default_resume_content())
    .fetch_one(&state.db)
    .await?;

    metering::increment_usage(state.subscriptions.as_ref(), user_id, Feature::Resumes).await?;

    Ok((StatusCode::CREATED, Json(resume)))
}

/// GET /api/v1/resumes
pub async fn handle_list(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<ResumeRow>>, AppError> {
    let resumes: Vec<ResumeRow> = sqlx::query_as(
        "SELECT id, user_id, title, template, content, created_at, updated_at \
         FROM resumes WHERE user_id = $1 ORDER BY updated_at DESC",
    )
    .bind(user_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(resumes))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ResumeRow>, AppError> {
    let resume: Option<ResumeRow> = sqlx::query_as(
        "SELECT id, user_id, title, template, content, created_at, updated_at \
         FROM resumes WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(&state.db)
    .await?;

    resume
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Resume not found".to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResumeRequest {
    pub title: Option<String>,
    pub template: Option<String>,
    pub content: Option<Value>,
}

/// PUT /api/v1/resumes/:id
pub async fn handle_update(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateResumeRequest>,
) -> Result<Json<ResumeRow>, AppError> {
    let resume: Option<ResumeRow> = sqlx::query_as(
        r#"
        UPDATE resumes SET
            title = COALESCE($3, title),
            template = COALESCE($4, template),
            content = COALESCE($5, content),
            updated_at = now()
        WHERE id = $1 AND user_id = $2
        RETURNING id, user_id, title, template, content, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(request.title)
    .bind(request.template)
    .bind(request.content)
    .fetch_optional(&state.db)
    .await?;

    resume
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Resume not found".to_string()))
}

/// DELETE /api/v1/resumes/:id
///
/// Deleting does not refund the usage counter; `resumes` counts creations
/// this month, not rows currently held.
pub async fn handle_delete(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM resumes WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Resume not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
