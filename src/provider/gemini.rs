//! Google Gemini `generateContent` client.
//!
//! Sends a single user turn and asks for a JSON-typed answer through
//! `generationConfig.responseMimeType`. The answer text is the concatenation
//! of the first candidate's parts; `usageMetadata` feeds the token counters.

use super::{Generation, GenerationOptions, GenerativeProvider};
use crate::error::GenerationError;
use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Header carrying the API key. Keeping the key out of the URL keeps it out
/// of `reqwest::Error` messages.
const API_KEY_HEADER: &str = "x-goog-api-key";

// --- Gemini-specific request and response structures ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

#[derive(Deserialize, Debug)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize, Debug)]
struct ErrorBody {
    message: String,
}

// --- Gemini Provider implementation ---

/// A provider for the Google Gemini REST API.
#[derive(Clone)]
pub struct GeminiProvider {
    client: ReqwestClient,
    api_base_url: String,
    model: String,
    api_key: String,
    timeout_secs: Option<u64>,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("api_base_url", &self.api_base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl GeminiProvider {
    /// Creates a new `GeminiProvider`.
    ///
    /// `timeout_secs = None` lets a request block until the service answers.
    pub fn new(
        api_base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: Option<u64>,
    ) -> Result<Self, GenerationError> {
        let mut builder = ReqwestClient::builder();
        if let Some(secs) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(GenerationError::Request)?;
        Ok(Self {
            client,
            api_base_url: api_base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
            timeout_secs,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.api_base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn map_send_error(&self, e: reqwest::Error) -> GenerationError {
        match self.timeout_secs {
            Some(secs) if e.is_timeout() => GenerationError::Timeout { secs },
            _ => GenerationError::Request(e.without_url()),
        }
    }
}

#[async_trait]
impl GenerativeProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Generation, GenerationError> {
        let request_body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: options.response_mime_type.as_deref(),
                temperature: options.temperature,
                max_output_tokens: options.max_output_tokens,
            },
        };

        debug!(
            "POST {} ({} prompt chars)",
            self.endpoint(),
            prompt.chars().count()
        );

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|env| env.error.message)
                .unwrap_or(body);
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GenerationError::Auth {
                    provider: self.name().to_string(),
                    detail: message,
                },
                StatusCode::TOO_MANY_REQUESTS => GenerationError::RateLimited {
                    provider: self.name().to_string(),
                    retry_after_secs,
                },
                _ => GenerationError::Api {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        let body = response.text().await.map_err(|e| self.map_send_error(e))?;
        let parsed: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|e| GenerationError::MalformedResponse {
                detail: e.to_string(),
            })?;

        let usage = parsed.usage_metadata.unwrap_or_default();
        let block_reason = parsed.prompt_feedback.and_then(|f| f.block_reason);

        let Some(candidate) = parsed.candidates.into_iter().next() else {
            return Err(GenerationError::EmptyResponse {
                reason: block_reason,
            });
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(GenerationError::EmptyResponse {
                reason: candidate.finish_reason.or(block_reason),
            });
        }

        debug!(
            "Gemini: {} prompt tokens, {} completion tokens",
            usage.prompt_token_count, usage.candidates_token_count
        );

        Ok(Generation {
            text,
            prompt_tokens: usage.prompt_token_count,
            completion_tokens: usage.candidates_token_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL: &str = "gemini-test";
    const ENDPOINT: &str = "/models/gemini-test:generateContent";

    fn provider(server: &MockServer) -> GeminiProvider {
        GeminiProvider::new(server.uri(), MODEL, "test-key", None).unwrap()
    }

    #[tokio::test]
    async fn sends_json_hint_and_returns_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .and(header(API_KEY_HEADER, "test-key"))
            .and(body_partial_json(json!({
                "contents": [{"role": "user", "parts": [{"text": "hello"}]}],
                "generationConfig": {"responseMimeType": "application/json"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {"parts": [{"text": "[{\"Question\":"}, {"text": "\"q\",\"Answer\":\"a\"}]"}]},
                    "finishReason": "STOP"
                }],
                "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 7}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let out = provider(&server)
            .generate("hello", &GenerationOptions::json())
            .await
            .unwrap();
        assert_eq!(out.text, "[{\"Question\":\"q\",\"Answer\":\"a\"}]");
        assert_eq!(out.prompt_tokens, 12);
        assert_eq!(out.completion_tokens, 7);
    }

    #[tokio::test]
    async fn unauthorised_maps_to_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {"code": 403, "message": "API key not valid.", "status": "PERMISSION_DENIED"}
            })))
            .mount(&server)
            .await;

        let err = provider(&server)
            .generate("hello", &GenerationOptions::json())
            .await
            .unwrap_err();
        match err {
            GenerationError::Auth { provider, detail } => {
                assert_eq!(provider, "gemini");
                assert_eq!(detail, "API key not valid.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn quota_maps_to_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "30")
                    .set_body_string("quota"),
            )
            .mount(&server)
            .await;

        let err = provider(&server)
            .generate("hello", &GenerationOptions::json())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GenerationError::RateLimited {
                retry_after_secs: Some(30),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn server_error_keeps_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(500).set_body_string("backend exploded"))
            .mount(&server)
            .await;

        let err = provider(&server)
            .generate("hello", &GenerationOptions::default())
            .await
            .unwrap_err();
        match err {
            GenerationError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "backend exploded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn blocked_prompt_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "promptFeedback": {"blockReason": "SAFETY"}
            })))
            .mount(&server)
            .await;

        let err = provider(&server)
            .generate("hello", &GenerationOptions::json())
            .await
            .unwrap_err();
        match err {
            GenerationError::EmptyResponse { reason } => {
                assert_eq!(reason.as_deref(), Some("SAFETY"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_envelope_is_malformed_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
            .mount(&server)
            .await;

        let err = provider(&server)
            .generate("hello", &GenerationOptions::json())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn connection_failure_does_not_reveal_api_key() {
        // Nothing listens on port 1.
        let p = GeminiProvider::new("http://127.0.0.1:1", "m", "SUPER-SECRET-KEY", None).unwrap();
        let err = p
            .generate("hello", &GenerationOptions::json())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Request(_)), "got {err:?}");
        assert!(!err.to_string().contains("SUPER-SECRET-KEY"), "{err}");
        assert!(!format!("{err:?}").contains("SUPER-SECRET-KEY"), "{err:?}");
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        let p = GeminiProvider::new("https://example.test/v1beta/", "m", "k", Some(5)).unwrap();
        assert_eq!(p.endpoint(), "https://example.test/v1beta/models/m:generateContent");
    }

    #[test]
    fn debug_hides_api_key() {
        let p = GeminiProvider::new("https://example.test", "m", "very-secret", None).unwrap();
        assert!(!format!("{p:?}").contains("very-secret"));
    }
}
