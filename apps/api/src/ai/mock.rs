//! Terminal chain element: deterministic, pure-computation fallback.
//!
//! The mock never fails, so the chain as a whole never surfaces an AI
//! outage to callers. ATS scores are keyword overlap between the resume
//! and the job description.

use async_trait::async_trait;
use serde_json::json;

use super::{AiProvider, AiRequest, AiTask, ProviderError};

pub const MOCK_MODEL: &str = "mock";

pub struct MockProvider;

#[async_trait]
impl AiProvider for MockProvider {
    fn name(&self) -> &str {
        MOCK_MODEL
    }

    async fn generate(&self, request: &AiRequest) -> Result<String, ProviderError> {
        Ok(match request.task {
            AiTask::Tailor => mock_tailored_content(request),
            AiTask::Ats => mock_ats_json(request),
        })
    }
}

pub fn mock_tailored_content(request: &AiRequest) -> String {
    let fragment: String = request.job_description.chars().take(60).collect();
    format!(
        "[Offline suggestion]\n\
         Based on the job description, here are some tailored suggestions:\n\
         1. Emphasize your experience with {fragment}...\n\
         2. Update your professional summary to mirror the role's key requirements.\n\
         3. Lead each achievement bullet with a measurable outcome."
    )
}

pub fn mock_ats_json(request: &AiRequest) -> String {
    let resume_lower = request.resume_text.to_lowercase();
    let keywords = keyword_inventory(&request.job_description);

    let (mut matched, mut missing) = (Vec::new(), Vec::new());
    for keyword in &keywords {
        if resume_lower.contains(keyword.as_str()) {
            matched.push(keyword.clone());
        } else {
            missing.push(keyword.clone());
        }
    }

    let match_score = if keywords.is_empty() {
        50
    } else {
        (matched.len() * 100 / keywords.len()) as u32
    };
    // Interviews are harder to land than keyword matches suggest.
    let success_rate = match_score * 4 / 5;
    missing.truncate(10);

    json!({
        "matchScore": match_score,
        "applicationSuccessRate": success_rate,
        "missingKeywords": missing,
        "profileSummary": format!(
            "Keyword-based estimate: the resume covers {} of {} terms found in the job description.",
            matched.len(),
            keywords.len()
        ),
        "suggestions": "Add the missing keywords where they truthfully apply, and quantify achievements with concrete numbers.",
        "rawText": ""
    })
    .to_string()
}

/// Distinct lowercase words of 4+ letters, in first-seen order.
fn keyword_inventory(text: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 4)
    {
        let word = word.to_lowercase();
        if !seen.contains(&word) {
            seen.push(word);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{extract_json_object, normalize_analysis};

    fn request(resume: &str, jd: &str, task: AiTask) -> AiRequest {
        AiRequest {
            task,
            resume_text: resume.to_string(),
            job_description: jd.to_string(),
            prompt: String::new(),
        }
    }

    #[test]
    fn test_full_overlap_scores_100() {
        let req = request(
            "rust engineer building axum services",
            "rust axum engineer",
            AiTask::Ats,
        );
        let value = extract_json_object(&mock_ats_json(&req)).unwrap();
        let analysis = normalize_analysis(&value, MOCK_MODEL);
        assert_eq!(analysis.match_score, 100);
        assert!(analysis.missing_keywords.is_empty());
    }

    #[test]
    fn test_no_overlap_scores_0_and_lists_missing() {
        let req = request("chef and baker", "kubernetes terraform golang", AiTask::Ats);
        let value = extract_json_object(&mock_ats_json(&req)).unwrap();
        let analysis = normalize_analysis(&value, MOCK_MODEL);
        assert_eq!(analysis.match_score, 0);
        assert_eq!(
            analysis.missing_keywords,
            vec!["kubernetes", "terraform", "golang"]
        );
    }

    #[test]
    fn test_keyword_inventory_dedupes_and_filters_short_words() {
        let keywords = keyword_inventory("Go and Rust, rust, RUST on AWS");
        assert_eq!(keywords, vec!["rust"]);
    }
}
