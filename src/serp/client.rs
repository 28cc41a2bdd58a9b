use std::env;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, warn};
use url::Url;

use super::types::{SearchRecord, SerpResponse};

const API_BASE: &str = "https://serpapi.com/search.json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, thiserror::Error)]
pub enum SerpError {
    #[error("SERPAPI_API_KEY not set. Get one at https://serpapi.com/manage-api-key")]
    ApiKeyNotSet,

    #[error("SerpApi rejected the API key ({0})")]
    Unauthorized(u16),

    #[error("SerpApi rate limit exceeded. Please retry later.")]
    RateLimited,

    #[error("SerpApi error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Network error: {0}")]
    Network(reqwest::Error),
}

/// Hosted keyword search.
/// Implemented by `SerpClient` for production; mock implementations used in tests.
pub trait WebSearch {
    async fn search(&self, query: &str, result_count: u8) -> Result<SearchRecord, SerpError>;
}

#[derive(Clone)]
struct ApiKey(String);

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[derive(Clone, Debug)]
pub struct SerpClient {
    http: Client,
    api_key: Option<ApiKey>,
    base_url: String,
}

impl SerpClient {
    /// Never fails: a missing key surfaces as `SerpError::ApiKeyNotSet` on
    /// each search, so the rest of the pipeline still runs.
    pub fn from_env(http: Client) -> Self {
        let api_key = env::var("SERPAPI_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .map(ApiKey);
        if api_key.is_none() {
            warn!("SERPAPI_API_KEY not set, web search will be skipped");
        }
        Self {
            http,
            api_key,
            base_url: API_BASE.to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            api_key: Some(ApiKey("test-key".to_string())),
            base_url: base_url.to_string(),
        }
    }
}

impl WebSearch for SerpClient {
    async fn search(&self, query: &str, result_count: u8) -> Result<SearchRecord, SerpError> {
        let api_key = self.api_key.as_ref().ok_or(SerpError::ApiKeyNotSet)?;
        let mut url = Url::parse(&self.base_url).map_err(|e| SerpError::Api {
            code: 0,
            message: format!("invalid base URL: {e}"),
        })?;
        url.query_pairs_mut()
            .append_pair("engine", "google")
            .append_pair("q", query)
            .append_pair("num", &result_count.to_string())
            .append_pair("api_key", &api_key.0);

        let response = self
            .http
            .get(url)
            .header("User-Agent", crate::USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(redact_url)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("SerpApi rate limited");
            return Err(SerpError::RateLimited);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SerpError::Unauthorized(status.as_u16()));
        }

        let text = response.text().await.map_err(redact_url)?;
        let body = match serde_json::from_str::<SerpResponse>(&text) {
            Ok(body) => body,
            Err(e) => {
                let end = text.floor_char_boundary(200);
                warn!(status = %status, error = %e, "SerpApi returned an unreadable body");
                return Err(SerpError::Api {
                    code: status.as_u16(),
                    message: format!("HTTP {status}: {}", &text[..end]),
                });
            }
        };

        if let Some(message) = body.error.clone() {
            warn!(error = %message, "SerpApi error");
            return Err(SerpError::Api {
                code: status.as_u16(),
                message,
            });
        }
        if !status.is_success() {
            return Err(SerpError::Api {
                code: status.as_u16(),
                message: format!("HTTP {status}"),
            });
        }

        let record = SearchRecord::from(body);
        debug!(
            organic = record.organic_results.len(),
            related = record.related_questions.len(),
            "serpapi search complete"
        );
        Ok(record)
    }
}

/// The request URL carries the API key; keep it out of error messages.
fn redact_url(e: reqwest::Error) -> SerpError {
    SerpError::Network(e.without_url())
}

#[cfg(test)]
mod http_tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn search_success_selects_sections() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("engine", "google"))
            .and(query_param("q", "data science career"))
            .and(query_param("num", "5"))
            .and(query_param("api_key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "organic_results": [{"title": "Data Scientist", "link": "https://example.com/ds"}],
                "knowledge_graph": {"title": "Data science"},
                "related_questions": [{"question": "How long does it take?"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = SerpClient::with_base_url(Client::new(), &server.uri());
        let record = client.search("data science career", 5).await.unwrap();

        assert_eq!(record.organic_results.len(), 1);
        assert_eq!(record.knowledge_graph["title"], "Data science");
        assert_eq!(record.related_questions.len(), 1);
    }

    #[tokio::test]
    async fn search_without_key_fails_before_request() {
        let client = SerpClient {
            http: Client::new(),
            api_key: None,
            base_url: "http://localhost:0".into(),
        };

        let err = client.search("anything", 10).await.unwrap_err();
        assert!(matches!(err, SerpError::ApiKeyNotSet));
        assert!(err.to_string().contains("SERPAPI_API_KEY"));
    }

    #[tokio::test]
    async fn network_error_does_not_leak_api_key() {
        let client = SerpClient::with_base_url(Client::new(), "http://127.0.0.1:1/search.json");

        let err = client.search("test", 10).await.unwrap_err();
        assert!(matches!(err, SerpError::Network(_)));
        assert!(!err.to_string().contains("test-key"), "got: {err}");
    }

    #[tokio::test]
    async fn search_429_returns_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = SerpClient::with_base_url(Client::new(), &server.uri());
        let result = client.search("test", 10).await;
        assert!(matches!(result, Err(SerpError::RateLimited)));
    }

    #[tokio::test]
    async fn search_401_returns_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = SerpClient::with_base_url(Client::new(), &server.uri());
        let result = client.search("test", 10).await;
        assert!(matches!(result, Err(SerpError::Unauthorized(401))));
    }

    #[tokio::test]
    async fn search_error_field_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": "Google hasn't returned any results for this query."
            })))
            .mount(&server)
            .await;

        let client = SerpClient::with_base_url(Client::new(), &server.uri());
        match client.search("zzzz", 10).await {
            Err(SerpError::Api { code: 200, message }) => {
                assert!(message.contains("any results"));
            }
            other => panic!("expected Api error, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn search_500_with_invalid_body_includes_snippet() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let client = SerpClient::with_base_url(Client::new(), &server.uri());
        match client.search("test", 10).await {
            Err(SerpError::Api { code: 500, message }) => {
                assert!(message.contains("upstream down"), "got: {message}");
            }
            other => panic!("expected Api(500), got: {other:?}"),
        }
    }
}
