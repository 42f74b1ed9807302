//! Portfolio CRUD and the public slug-based site route.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::metering;
use crate::models::portfolio::{default_portfolio_content, PortfolioRow};
use crate::plans::Feature;
use crate::state::AppState;

const PORTFOLIO_COLUMNS: &str =
    "id, user_id, title, slug, template, content, published, created_at, updated_at";

/// Random starter slug; the owner can rename it later via update.
fn generate_slug() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("user-{}", &id[..12])
}

fn validate_slug(slug: &str) -> Result<(), AppError> {
    let valid = !slug.is_empty()
        && slug.len() <= 63
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !slug.starts_with('-')
        && !slug.ends_with('-');
    if valid {
        Ok(())
    } else {
        Err(AppError::Validation(
            "Slug must be lowercase letters, digits, and hyphens".to_string(),
        ))
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreatePortfolioRequest {
    pub title: Option<String>,
}

/// POST /api/v1/portfolios
pub async fn handle_create(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    body: Option<Json<CreatePortfolioRequest>>,
) -> Result<(StatusCode, Json<PortfolioRow>), AppError> {
    metering::check_usage_limit(state.subscriptions.as_ref(), user_id, Feature::Portfolios)
        .await?
        .require(Feature::Portfolios)?;

    let title = body
        .and_then(|Json(b)| b.title)
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| "My Creative Portfolio".to_string());

    let portfolio: PortfolioRow = sqlx::query_as(&format!(
        "INSERT INTO portfolios (user_id, title, slug, content) \
         VALUES ($1, $2, $3, $4) \
         RETURNING {PORTFOLIO_COLUMNS}"
    ))
    .bind(user_id)
    .bind(title)
    .bind(generate_slug())
    .bind(default_portfolio_content())
    .fetch_one(&state.db)
    .await?;

    metering::increment_usage(state.subscriptions.as_ref(), user_id, Feature::Portfolios).await?;

    Ok((StatusCode::CREATED, Json(portfolio)))
}

/// GET /api/v1/portfolios
pub async fn handle_list(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<PortfolioRow>>, AppError> {
    let portfolios: Vec<PortfolioRow> = sqlx::query_as(&format!(
        "SELECT {PORTFOLIO_COLUMNS} FROM portfolios \
         WHERE user_id = $1 ORDER BY updated_at DESC"
    ))
    .bind(user_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(portfolios))
}

/// GET /api/v1/portfolios/:id
pub async fn handle_get(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PortfolioRow>, AppError> {
    let portfolio: Option<PortfolioRow> = sqlx::query_as(&format!(
        "SELECT {PORTFOLIO_COLUMNS} FROM portfolios WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(&state.db)
    .await?;

    portfolio
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Portfolio not found".to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePortfolioRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub template: Option<String>,
    pub content: Option<Value>,
    pub published: Option<bool>,
}

/// PUT /api/v1/portfolios/:id
pub async fn handle_update(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePortfolioRequest>,
) -> Result<Json<PortfolioRow>, AppError> {
    if let Some(slug) = &request.slug {
        validate_slug(slug)?;
    }

    let result: Result<Option<PortfolioRow>, sqlx::Error> = sqlx::query_as(&format!(
        r#"
        UPDATE portfolios SET
            title = COALESCE($3, title),
            slug = COALESCE($4, slug),
            template = COALESCE($5, template),
            content = COALESCE($6, content),
            published = COALESCE($7, published),
            updated_at = now()
        WHERE id = $1 AND user_id = $2
        RETURNING {PORTFOLIO_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(user_id)
    .bind(request.title)
    .bind(request.slug)
    .bind(request.template)
    .bind(request.content)
    .bind(request.published)
    .fetch_optional(&state.db)
    .await;

    match result {
        Ok(Some(portfolio)) => Ok(Json(portfolio)),
        Ok(None) => Err(AppError::NotFound("Portfolio not found".to_string())),
        // Unique-violation on the slug column reads better as a 400 than a 500.
        Err(sqlx::Error::Database(e)) if e.constraint() == Some("portfolios_slug_key") => Err(
            AppError::Validation("That slug is already taken".to_string()),
        ),
        Err(e) => Err(e.into()),
    }
}

/// DELETE /api/v1/portfolios/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM portfolios WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Portfolio not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Public view of a published portfolio: no owner fields.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicPortfolio {
    pub title: String,
    pub slug: String,
    pub template: String,
    pub content: Value,
}

/// GET /p/:slug: the published portfolio site, no authentication.
pub async fn handle_public(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PublicPortfolio>, AppError> {
    let portfolio: Option<PortfolioRow> = sqlx::query_as(&format!(
        "SELECT {PORTFOLIO_COLUMNS} FROM portfolios WHERE slug = $1 AND published = TRUE"
    ))
    .bind(slug)
    .fetch_optional(&state.db)
    .await?;

    portfolio
        .map(|p| {
            Json(PublicPortfolio {
                title: p.title,
                slug: p.slug,
                template: p.template,
                content: p.content,
            })
        })
        .ok_or_else(|| AppError::NotFound("Portfolio not found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_slug_is_valid() {
        let slug = generate_slug();
        assert!(validate_slug(&slug).is_ok(), "generated slug {slug}");
    }

    #[test]
    fn test_slug_validation() {
        assert!(validate_slug("jane-doe-42").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("Jane").is_err());
        assert!(validate_slug("-leading").is_err());
        assert!(validate_slug("trailing-").is_err());
        assert!(validate_slug("has space").is_err());
    }
}
