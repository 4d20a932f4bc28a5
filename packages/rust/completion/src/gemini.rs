//! Gemini `generateContent` client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use docchat_shared::{CompletionConfig, DocChatError, Result};

use crate::CompletionClient;

const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const API_KEY_HEADER: &str = "x-goog-api-key";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

// ---------------------------------------------------------------------------
// GeminiClient
// ---------------------------------------------------------------------------

/// Client for `POST /v1beta/models/{model}:generateContent`.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl GeminiClient {
    /// A client for the default model with a 120 s request timeout.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::build(api_key.into(), DEFAULT_TIMEOUT)
    }

    /// Build a client from the `[completion]` config section.
    pub fn from_config(api_key: impl Into<String>, config: &CompletionConfig) -> Result<Self> {
        Ok(
            Self::build(api_key.into(), Duration::from_secs(config.timeout_secs))?
                .with_model(&config.model)
                .with_base_url(&config.api_base_url),
        )
    }

    fn build(api_key: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Replace the HTTP client with one that gives up after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = http_client(timeout)?;
        self.timeout = timeout;
        Ok(self)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| DocChatError::generation_failed("failed to build HTTP client", e))
}

#[async_trait]
impl CompletionClient for GeminiClient {
    #[instrument(skip_all, fields(model = %self.model, prompt_chars = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DocChatError::generation_failed("request to completion service failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|env| match env.error.status {
                    Some(code) => format!("{code}: {}", env.error.message),
                    None => env.error.message,
                })
                .unwrap_or(text);
            warn!(%status, "completion service returned an error");
            return Err(DocChatError::generation_status(format!(
                "HTTP {status}: {detail}"
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| DocChatError::generation_failed("invalid completion response", e))?;

        let Some(candidate) = parsed.candidates.into_iter().next() else {
            let reason = parsed
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates returned".to_string());
            return Err(DocChatError::generation_status(format!(
                "response blocked: {reason}"
            )));
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".into());
            return Err(DocChatError::generation_status(format!(
                "empty response (finish reason: {reason})"
            )));
        }

        debug!(answer_chars = text.len(), "completion received");
        info!("generated answer");
        Ok(text)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GeminiClient {
        GeminiClient::new("test-key")
            .expect("build")
            .with_model("gemini-test")
            .with_base_url(format!("{}/", server.uri()))
    }

    #[tokio::test]
    async fn sends_prompt_and_joins_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-test:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "contents": [{"parts": [{"text": "What is the leave policy?"}]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "Twelve "}, {"text": "days."}]},
                    "finishReason": "STOP"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let answer = client(&server)
            .generate("What is the leave policy?")
            .await
            .expect("generate");
        assert_eq!(answer, "Twelve days.");
    }

    #[tokio::test]
    async fn api_errors_are_generation_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}
            })))
            .mount(&server)
            .await;

        let err = client(&server).generate("hi").await.unwrap_err();
        assert!(matches!(err, DocChatError::GenerationFailed { .. }));
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("RESOURCE_EXHAUSTED: Quota exceeded"));
    }

    #[tokio::test]
    async fn blocked_prompt_reports_reason() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "promptFeedback": {"blockReason": "SAFETY"}
            })))
            .mount(&server)
            .await;

        let err = client(&server).generate("hi").await.unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[tokio::test]
    async fn unreachable_service_is_generation_failure() {
        // Nothing listens on port 9 of localhost in test environments
        let client = GeminiClient::new("k")
            .expect("build")
            .with_base_url("http://127.0.0.1:9");
        let err = client.generate("hi").await.unwrap_err();
        assert!(matches!(err, DocChatError::GenerationFailed { .. }));
    }

    #[tokio::test]
    async fn slow_service_hits_the_request_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"candidates": []}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .with_timeout(Duration::from_millis(100))
            .expect("build")
            .generate("hi")
            .await
            .unwrap_err();
        assert!(matches!(err, DocChatError::GenerationFailed { .. }));
        assert!(!err.to_string().contains("blocked"));
    }

    #[test]
    fn default_client_has_a_request_timeout() {
        let client = GeminiClient::new("k").expect("build");
        assert_eq!(client.timeout(), Duration::from_secs(120));
        assert_eq!(client.model(), "gemini-1.5-flash");
    }

    #[test]
    fn config_sets_model_and_endpoint() {
        let config = CompletionConfig {
            model: "gemini-pro".into(),
            api_base_url: "https://example.test/".into(),
            ..CompletionConfig::default()
        };
        let client = GeminiClient::from_config("k", &config).expect("build");
        assert_eq!(client.model(), "gemini-pro");
        assert_eq!(client.timeout(), Duration::from_secs(config.timeout_secs));
        assert_eq!(
            client.endpoint(),
            "https://example.test/v1beta/models/gemini-pro:generateContent"
        );
    }
}
