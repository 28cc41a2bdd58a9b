use tracing::warn;

use super::types::GenerateContentResponse;

/// Text produced by a completion call, unwrapped once from the response.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    text: Option<String>,
    finish_reason: Option<String>,
}

impl Completion {
    /// Joins the text parts of the first candidate. Blank output counts as no text.
    pub fn from_response(response: &GenerateContentResponse) -> Self {
        let candidate = response.candidates.as_ref().and_then(|c| c.first());

        let text = candidate
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .map(|part| part.text.as_str())
                    .collect::<String>()
            })
            .filter(|text| !text.trim().is_empty());

        let finish_reason = candidate.and_then(|c| c.finish_reason.clone());

        if text.is_none() {
            warn!(
                finish_reason = finish_reason.as_deref().unwrap_or("none"),
                "Gemini returned empty completion"
            );
        }

        Self {
            text,
            finish_reason,
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.finish_reason.as_deref()
    }

    #[cfg(test)]
    pub(crate) fn from_text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            finish_reason: Some("STOP".to_string()),
        }
    }
}
