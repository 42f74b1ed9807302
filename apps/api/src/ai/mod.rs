//! AI provider chain: tailoring and ATS analysis with ordered fallback.
//!
//! Attempt order: Gemini (primary) → Groq (secondary) → deterministic mock.
//! Each provider failure is logged and swallowed before trying the next; the
//! mock is the list's guaranteed-succeeding terminal element, so callers see
//! success with a degraded payload rather than an upstream AI outage.

pub mod gemini;
pub mod groq;
pub mod mock;
pub mod prompts;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::errors::AppError;

/// Outbound AI calls are user-facing and must not hang indefinitely.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Provider returned empty content")]
    EmptyContent,
}

/// Which capability a request exercises. The mock branches on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiTask {
    Tailor,
    Ats,
}

#[derive(Debug, Clone)]
pub struct AiRequest {
    pub task: AiTask,
    pub resume_text: String,
    pub job_description: String,
    pub prompt: String,
}

/// One provider strategy in the chain. Implementations must be independent:
/// a failure is absorbed by the chain, never propagated to callers.
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Free-text provider/model identifier, surfaced as `modelUsed`.
    fn name(&self) -> &str;

    async fn generate(&self, request: &AiRequest) -> Result<String, ProviderError>;
}

/// Normalized ATS analysis shape returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtsAnalysis {
    pub match_score: u32,
    pub application_success_rate: u32,
    pub missing_keywords: Vec<String>,
    pub profile_summary: String,
    pub suggestions: String,
    pub raw_text: String,
    pub model_used: String,
}

pub struct AiChain {
    providers: Vec<Box<dyn AiProvider>>,
}

impl AiChain {
    /// Builds the chain from configured API keys. Providers without a key
    /// are omitted; the mock terminal element is always present.
    pub fn from_config(config: &Config) -> Self {
        let mut providers: Vec<Box<dyn AiProvider>> = Vec::new();
        if let Some(key) = &config.gemini_api_key {
            providers.push(Box::new(gemini::GeminiProvider::new(key.clone())));
        }
        if let Some(key) = &config.groq_api_key {
            providers.push(Box::new(groq::GroqProvider::new(key.clone())));
        }
        providers.push(Box::new(mock::MockProvider));
        Self { providers }
    }

    #[cfg(test)]
    pub fn with_providers(providers: Vec<Box<dyn AiProvider>>) -> Self {
        Self { providers }
    }

    /// Free-text tailoring: the first successful provider's raw text.
    pub async fn generate_tailored_content(
        &self,
        resume_text: &str,
        job_description: &str,
    ) -> Result<String, AppError> {
        validate_inputs(resume_text, job_description)?;

        let request = AiRequest {
            task: AiTask::Tailor,
            resume_text: resume_text.to_string(),
            job_description: job_description.to_string(),
            prompt: prompts::tailor_prompt(resume_text, job_description),
        };

        for provider in &self.providers {
            match provider.generate(&request).await {
                Ok(text) if !text.trim().is_empty() => {
                    debug!("Tailored content generated by {}", provider.name());
                    return Ok(text);
                }
                Ok(_) => warn!("Provider {} returned empty content", provider.name()),
                Err(e) => warn!("Provider {} failed: {e}", provider.name()),
            }
        }

        // Unreachable with the mock terminal element in place, but the chain
        // must not error out over it.
        Ok(mock::mock_tailored_content(&request))
    }

    /// Structured ATS analysis. Raw provider output that cannot be parsed
    /// into a JSON object counts as a provider failure and falls through.
    pub async fn generate_ats_analysis(
        &self,
        resume_text: &str,
        job_description: &str,
    ) -> Result<AtsAnalysis, AppError> {
        validate_inputs(resume_text, job_description)?;

        let request = AiRequest {
            task: AiTask::Ats,
            resume_text: resume_text.to_string(),
            job_description: job_description.to_string(),
            prompt: prompts::ats_prompt(resume_text, job_description),
        };

        for provider in &self.providers {
            match provider.generate(&request).await {
                Ok(raw) => match extract_json_object(&raw) {
                    Some(value) => {
                        debug!("ATS analysis generated by {}", provider.name());
                        return Ok(normalize_analysis(&value, provider.name()));
                    }
                    None => warn!(
                        "Provider {} returned unparseable ATS output",
                        provider.name()
                    ),
                },
                Err(e) => warn!("Provider {} failed: {e}", provider.name()),
            }
        }

        let value = extract_json_object(&mock::mock_ats_json(&request))
            .unwrap_or_else(|| Value::Object(Default::default()));
        Ok(normalize_analysis(&value, mock::MOCK_MODEL))
    }
}

fn validate_inputs(resume_text: &str, job_description: &str) -> Result<(), AppError> {
    if resume_text.trim().is_empty() {
        return Err(AppError::Validation("Resume text is required".to_string()));
    }
    if job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "Job description is required".to_string(),
        ));
    }
    Ok(())
}

/// Pulls a JSON object out of raw model output, which may be fenced in
/// markdown or embedded in surrounding prose.
pub fn extract_json_object(raw: &str) -> Option<Value> {
    let stripped = strip_json_fences(raw);

    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(stripped) {
        return Some(value);
    }

    // Fall back to the outermost brace span.
    let start = stripped.find('{')?;
    let end = stripped.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&stripped[start..=end]) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

/// Coerces a raw provider object into the fixed analysis shape.
pub fn normalize_analysis(value: &Value, model_used: &str) -> AtsAnalysis {
    AtsAnalysis {
        match_score: clamp_score(value.get("matchScore")),
        application_success_rate: clamp_score(value.get("applicationSuccessRate")),
        missing_keywords: coerce_keywords(value.get("missingKeywords")),
        profile_summary: coerce_string(value.get("profileSummary")),
        suggestions: coerce_string(value.get("suggestions")),
        raw_text: coerce_string(value.get("rawText")),
        model_used: model_used.to_string(),
    }
}

/// Integer clamped to [0, 100]; non-numeric or missing input coerces to 0.
fn clamp_score(value: Option<&Value>) -> u32 {
    let n = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    (n.round() as i64).clamp(0, 100) as u32
}

/// A native list of strings, or a comma/newline-delimited string.
fn coerce_keywords(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                other => Some(other.to_string()),
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split(|c| c == ',' || c == '\n')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn coerce_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingProvider;

    #[async_trait]
    impl AiProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        async fn generate(&self, _request: &AiRequest) -> Result<String, ProviderError> {
            Err(ProviderError::Api {
                status: 503,
                message: "service unavailable".to_string(),
            })
        }
    }

    fn all_failing_chain() -> AiChain {
        AiChain::with_providers(vec![
            Box::new(FailingProvider),
            Box::new(FailingProvider),
            Box::new(mock::MockProvider),
        ])
    }

    #[tokio::test]
    async fn test_empty_inputs_are_validation_errors() {
        let chain = all_failing_chain();

        let err = chain.generate_ats_analysis("", "non-empty").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = chain.generate_ats_analysis("non-empty", "").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = chain.generate_ats_analysis("   ", "\n\t").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_all_providers_failing_falls_back_to_mock() {
        let chain = all_failing_chain();

        let analysis = chain
            .generate_ats_analysis("Rust engineer with axum experience", "Senior Rust developer")
            .await
            .unwrap();

        assert_eq!(analysis.model_used, "mock");
        assert!(analysis.match_score <= 100);
        assert!(analysis.application_success_rate <= 100);
    }

    #[tokio::test]
    async fn test_mock_is_deterministic() {
        let chain = all_failing_chain();
        let a = chain.generate_ats_analysis("r", "j").await.unwrap();
        let b = chain.generate_ats_analysis("r", "j").await.unwrap();
        assert_eq!(a.match_score, b.match_score);
        assert_eq!(a.application_success_rate, b.application_success_rate);
        assert_eq!(a.missing_keywords, b.missing_keywords);
    }

    #[tokio::test]
    async fn test_tailor_fallback_embeds_job_description_fragment() {
        let chain = all_failing_chain();
        let suggestion = chain
            .generate_tailored_content("My resume", "Kubernetes platform engineer")
            .await
            .unwrap();
        assert!(suggestion.contains("Kubernetes"));
    }

    #[test]
    fn test_normalize_clamps_and_splits_keywords() {
        let value = serde_json::json!({
            "matchScore": 150,
            "missingKeywords": "a, b, c"
        });
        let analysis = normalize_analysis(&value, "test");
        assert_eq!(analysis.match_score, 100);
        assert_eq!(analysis.missing_keywords, vec!["a", "b", "c"]);
        assert_eq!(analysis.application_success_rate, 0);
        assert_eq!(analysis.profile_summary, "");
    }

    #[test]
    fn test_normalize_negative_and_non_numeric_scores() {
        let value = serde_json::json!({
            "matchScore": -20,
            "applicationSuccessRate": "not a number",
            "missingKeywords": ["rust", "axum", 7],
            "profileSummary": 42
        });
        let analysis = normalize_analysis(&value, "test");
        assert_eq!(analysis.match_score, 0);
        assert_eq!(analysis.application_success_rate, 0);
        assert_eq!(analysis.missing_keywords, vec!["rust", "axum", "7"]);
        assert_eq!(analysis.profile_summary, "42");
    }

    #[test]
    fn test_extract_json_from_fences_and_prose() {
        let fenced = "```json\n{\"matchScore\": 80}\n```";
        assert!(extract_json_object(fenced).is_some());

        let prose = "Here is your analysis: {\"matchScore\": 80} — good luck!";
        let value = extract_json_object(prose).unwrap();
        assert_eq!(value["matchScore"], 80);

        assert!(extract_json_object("no json here").is_none());
        assert!(extract_json_object("[1, 2, 3]").is_none());
    }
}
