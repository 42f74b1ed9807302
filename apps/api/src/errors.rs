use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::plans::{Feature, PlanTier};

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Usage limit reached for {feature}: {current}/{limit} on the {plan} plan")]
    LimitReached {
        feature: Feature,
        current: u32,
        limit: u32,
        plan: PlanTier,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Stripe error: {0}")]
    Stripe(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::NotFound(msg) => error_body(
                StatusCode::NOT_FOUND,
                json!({ "error": "not_found", "message": msg }),
            ),
            AppError::Validation(msg) => error_body(
                StatusCode::BAD_REQUEST,
                json!({ "error": "validation_error", "message": msg }),
            ),
            AppError::Unauthorized => error_body(
                StatusCode::UNAUTHORIZED,
                json!({ "error": "unauthorized", "message": "Authentication required" }),
            ),
            AppError::LimitReached {
                feature,
                current,
                limit,
                plan,
            } => error_body(
                StatusCode::FORBIDDEN,
                json!({
                    "error": "limit_reached",
                    "message": format!(
                        "You've reached your {} limit ({current} of {limit}) on the {} plan. \
                         Upgrade to Pro for higher limits.",
                        feature.display_name(),
                        plan.as_str(),
                    ),
                    "current": current,
                    "limit": limit,
                    "plan": plan.as_str(),
                }),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                error_body(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "database_error", "message": "A database error occurred" }),
                )
            }
            AppError::Stripe(msg) => {
                tracing::error!("Stripe error: {msg}");
                error_body(
                    StatusCode::BAD_GATEWAY,
                    json!({ "error": "billing_error", "message": "A billing error occurred" }),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                error_body(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal_error", "message": "An internal server error occurred" }),
                )
            }
        }
    }
}

fn error_body(status: StatusCode, body: serde_json::Value) -> Response {
    (status, Json(body)).into_response()
}
