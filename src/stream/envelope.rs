//! Upstream response envelope.
//!
//! Each SSE payload is a `streamGenerateContent` response document; the model
//! text lives in the parts of the first candidate.

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct StreamResponse {
    #[serde(default)]
    pub candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Option<Vec<Part>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
}

impl StreamResponse {
    /// Concatenated text parts of the first candidate.
    pub fn model_text(&self) -> Option<String> {
        let parts = self
            .candidates
            .as_ref()?
            .first()?
            .content
            .as_ref()?
            .parts
            .as_ref()?;
        Some(parts.iter().filter_map(|part| part.text.as_deref()).collect())
    }
}

/// Decode one envelope frame and pull out its model text.
pub fn extract_model_text(frame: &str) -> Result<Option<String>, serde_json::Error> {
    let response: StreamResponse = serde_json::from_str(frame)?;
    Ok(response.model_text())
}
