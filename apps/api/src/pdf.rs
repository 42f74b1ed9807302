use tracing::warn;

/// Extracts plain text from an uploaded resume PDF. Extraction failure is
/// not fatal; the ATS route falls back to manually pasted resume text, so
/// this returns an empty string and logs instead of erroring.
pub fn extract_text(bytes: &[u8]) -> String {
    match pdf_extract::extract_text_from_mem(bytes) {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            warn!("PDF text extraction failed ({} bytes): {e}", bytes.len());
            String::new()
        }
    }
}
