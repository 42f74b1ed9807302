use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub template: String,
    /// Sections: personal info, experience, education, skills, projects.
    pub content: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Starter content for a freshly created resume.
pub fn default_resume_content() -> Value {
    serde_json::json!({
        "personalInfo": { "fullName": "Your Name", "email": "email@example.com" },
        "summary": "",
        "experience": [],
        "education": [],
        "skills": [],
        "projects": []
    })
}
