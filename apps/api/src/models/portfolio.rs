use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PortfolioRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    /// Public URL path segment, `/p/{slug}`. Unique across all portfolios.
    pub slug: String,
    pub template: String,
    pub content: Value,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Starter content for a freshly created portfolio.
pub fn default_portfolio_content() -> Value {
    serde_json::json!({
        "hero": {
            "title": "Hello, I'm a Creator",
            "subtitle": "Digital Designer & Developer",
            "ctaText": "Get in Touch",
            "ctaLink": "#contact"
        },
        "about": {
            "title": "About Me",
            "description": "I am a passionate creator building digital experiences."
        },
        "projects": [],
        "contact": {}
    })
}
