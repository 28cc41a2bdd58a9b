use std::env;
use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::completion::Completion;
use super::types::{
    ApiError, Content, EmbedContentRequest, EmbedContentResponse, ErrorEnvelope,
    GenerateContentRequest, GenerateContentResponse, GenerationConfig,
};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_EMBEDDING_MODEL: &str = "gemini-embedding-001";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const TEMPERATURE: f32 = 0.7;

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("GEMINI_API_KEY not set. Get one at https://aistudio.google.com/apikey")]
    ApiKeyNotSet,

    #[error("API rate limit exceeded. Please retry later.")]
    RateLimited,

    #[error("API quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("API returned an empty embedding")]
    EmptyEmbedding,

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Hosted LLM completion.
/// Implemented by `GeminiClient` for production; mock implementations used in tests.
pub trait Summarizer {
    async fn complete(&self, prompt: &str) -> Result<Completion, GeminiError>;
}

/// Text embeddings for the vector store.
pub trait Embedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, GeminiError>;
}

#[derive(Clone)]
struct ApiKey(String);

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[derive(Clone, Debug)]
pub struct GeminiClient {
    http: Client,
    api_key: ApiKey,
    model: String,
    embedding_model: String,
    base_url: String,
}

impl GeminiClient {
    /// Reads `GEMINI_API_KEY` (or `GOOGLE_API_KEY`), `GEMINI_MODEL` and
    /// `GEMINI_EMBEDDING_MODEL`.
    pub fn from_env(http: Client) -> Result<Self, GeminiError> {
        let api_key = ["GEMINI_API_KEY", "GOOGLE_API_KEY"]
            .iter()
            .filter_map(|name| env::var(name).ok())
            .map(|k| k.trim().to_string())
            .find(|k| !k.is_empty())
            .ok_or(GeminiError::ApiKeyNotSet)?;
        Ok(Self {
            http,
            api_key: ApiKey(api_key),
            model: env_or("GEMINI_MODEL", DEFAULT_MODEL),
            embedding_model: env_or("GEMINI_EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
            base_url: API_BASE.to_string(),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            api_key: ApiKey("test-key".to_string()),
            model: DEFAULT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            base_url: base_url.to_string(),
        }
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        model: &str,
        method: &str,
        body: &impl Serialize,
    ) -> Result<T, GeminiError> {
        let url = format!("{}/{}:{}", self.base_url, model, method);

        debug_assert!(
            url.starts_with("https://") || cfg!(test),
            "API key must only be sent over HTTPS"
        );

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key.0)
            .header("User-Agent", crate::USER_AGENT)
            .json(body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("Gemini API rate limited");
            return Err(GeminiError::RateLimited);
        }

        let text = response.text().await?;
        if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(&text)
            && let Some(err) = &envelope.error
        {
            let classified = classify_api_error(err);
            warn!(error = %classified, method, "Gemini API error");
            return Err(classified);
        }
        if !status.is_success() {
            let end = text.floor_char_boundary(200);
            warn!(status = %status, method, "Gemini API error (no structured body)");
            return Err(GeminiError::Api {
                code: status.as_u16(),
                message: format!("HTTP {status}: {}", &text[..end]),
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}

impl Summarizer for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<Completion, GeminiError> {
        let request = GenerateContentRequest {
            contents: vec![Content::user_text(prompt)],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
            },
        };
        let response: GenerateContentResponse = self
            .post_json(&self.model, "generateContent", &request)
            .await?;
        debug!(model = %self.model, "gemini completion complete");
        Ok(Completion::from_response(&response))
    }
}

impl Embedder for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, GeminiError> {
        let request = EmbedContentRequest {
            model: format!("models/{}", self.embedding_model),
            content: Content::user_text(text),
        };
        let response: EmbedContentResponse = self
            .post_json(&self.embedding_model, "embedContent", &request)
            .await?;
        response
            .embedding
            .map(|e| e.values)
            .filter(|values| !values.is_empty())
            .ok_or(GeminiError::EmptyEmbedding)
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn classify_api_error(err: &ApiError) -> GeminiError {
    let message = err
        .message
        .clone()
        .unwrap_or_else(|| "Unknown error".to_string());

    match err.code {
        Some(429) => GeminiError::RateLimited,
        Some(403) => GeminiError::QuotaExhausted(message),
        Some(code) => GeminiError::Api { code, message },
        None => GeminiError::Api {
            code: 0,
            message: format!("Unknown error (no status code): {message}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_429_as_rate_limited() {
        let err = ApiError {
            code: Some(429),
            message: Some("Resource exhausted".into()),
        };
        assert!(matches!(classify_api_error(&err), GeminiError::RateLimited));
    }

    #[test]
    fn classify_403_as_quota_exhausted() {
        let err = ApiError {
            code: Some(403),
            message: Some("Quota exceeded".into()),
        };
        assert!(matches!(
            classify_api_error(&err),
            GeminiError::QuotaExhausted(_)
        ));
    }

    #[test]
    fn classify_missing_code_keeps_message() {
        let err = ApiError {
            code: None,
            message: Some("odd".into()),
        };
        match classify_api_error(&err) {
            GeminiError::Api { code, message } => {
                assert_eq!(code, 0);
                assert!(message.contains("odd"));
            }
            other => panic!("expected Api error, got: {other:?}"),
        }
    }

    #[test]
    fn api_key_is_redacted_in_debug() {
        let client = GeminiClient::with_base_url(Client::new(), "http://localhost:0");
        assert!(!format!("{client:?}").contains("test-key"));
    }
}
