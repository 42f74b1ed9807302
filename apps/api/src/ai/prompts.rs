//! Prompt builders for the tailoring and ATS capabilities.

/// Determinism is best-effort at the prompt level: providers are instructed
/// to behave deterministically and calls use temperature 0, but byte-
/// identical output across invocations is not guaranteed.
const DETERMINISM_INSTRUCTION: &str = "Be deterministic: given identical input, \
produce identical output. Do not add commentary, preamble, or apologies.";

pub fn tailor_prompt(resume_text: &str, job_description: &str) -> String {
    format!(
        "Role: Professional Resume Writer.\n\
         Task: Tailor the following resume content to match the job description.\n\
         {DETERMINISM_INSTRUCTION}\n\n\
         Job Description:\n{job_description}\n\n\
         Resume Content:\n{resume_text}\n\n\
         Output:\n\
         Provide a revised Professional Summary and 3-5 tailored bullet points \
         for Key Achievements that align with the job requirements."
    )
}

pub fn ats_prompt(resume_text: &str, job_description: &str) -> String {
    format!(
        "Role: Applicant Tracking System (ATS) analyst.\n\
         Task: Score how well the resume matches the job description.\n\
         {DETERMINISM_INSTRUCTION}\n\n\
         Job Description:\n{job_description}\n\n\
         Resume:\n{resume_text}\n\n\
         Respond with a single JSON object and nothing else, using exactly \
         these keys:\n\
         {{\n\
           \"matchScore\": <integer 0-100>,\n\
           \"applicationSuccessRate\": <integer 0-100>,\n\
           \"missingKeywords\": [<strings>],\n\
           \"profileSummary\": <string>,\n\
           \"suggestions\": <string>\n\
         }}"
    )
}
