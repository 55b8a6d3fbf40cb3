//! Google Gemini provider (`generateContent`).
//!
//! The rendered prompt is sent as a single user turn. When the request
//! carries a response schema, the call asks for `application/json` output
//! constrained to that schema, so the reply is one step object.

use async_trait::async_trait;
use serde::Deserialize;
use stepwise_core::error::ProviderError;
use stepwise_core::provider::{ModelRequest, ModelResponse, Usage};
use tracing::{debug, warn};

use crate::http::{build_client, error_from_status, retry_after, transport_error};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// A Gemini API provider.
pub struct GeminiProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Create a provider against the public Gemini endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            name: "gemini".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client: build_client(),
        }
    }

    /// Point the provider at a different endpoint (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn model_url(&self, model: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/models/{model}:generateContent", self.base_url)
    }

    fn build_body(request: &ModelRequest) -> serde_json::Value {
        let mut generation_config = serde_json::json!({
            "temperature": request.temperature,
        });

        if let Some(schema) = &request.response_schema {
            generation_config["responseMimeType"] = serde_json::json!("application/json");
            generation_config["responseSchema"] = schema.clone();
        }

        serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.prompt }]
            }],
            "generationConfig": generation_config,
        })
    }

    fn extract_text(response: GenerateResponse) -> Result<(String, Option<Usage>, Option<String>), ProviderError> {
        let usage = response.usage_metadata.map(|u| Usage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        });

        let candidate = response
            .candidates
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No candidates in response".into()))?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".into());
            return Err(ProviderError::InvalidResponse(format!(
                "Candidate has no text (finish reason: {reason})"
            )));
        }

        Ok((text, usage, response.model_version))
    }
}

#[async_trait]
impl stepwise_core::Provider for GeminiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ProviderError> {
        let url = self.model_url(&request.model);
        let body = Self::build_body(&request);

        debug!(provider = %self.name, model = %request.model, "Sending generateContent request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();

        if status != 200 {
            let retry = retry_after(response.headers());
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Gemini returned error");
            return Err(error_from_status(status, retry, &error_body));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        let (text, usage, model_version) = Self::extract_text(parsed)?;

        Ok(ModelResponse {
            text,
            usage,
            model: model_version.unwrap_or(request.model),
        })
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(transport_error)?;

        Ok(response.status().is_success())
    }
}

// --- Gemini API types (internal) ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Option<Vec<Candidate>>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_server::serve_once;
    use stepwise_core::Provider;
    use stepwise_core::step_response_schema;

    #[test]
    fn model_url_strips_prefix() {
        let provider = GeminiProvider::new("k").with_base_url("http://localhost:1/v1beta/");
        assert_eq!(
            provider.model_url("models/gemini-2.0-flash-exp"),
            "http://localhost:1/v1beta/models/gemini-2.0-flash-exp:generateContent"
        );
    }

    #[test]
    fn body_requests_json_with_schema() {
        let request = ModelRequest::new("gemini-2.0-flash-exp", "PROMPT")
            .with_schema(step_response_schema())
            .with_temperature(0.2);
        let body = GeminiProvider::build_body(&request);
        assert_eq!(body["contents"][0]["parts"][0]["text"], "PROMPT");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(
            body["generationConfig"]["responseSchema"]["properties"]["step"]["type"],
            "STRING"
        );
    }

    #[test]
    fn body_without_schema_is_plain_text() {
        let body = GeminiProvider::build_body(&ModelRequest::new("m", "hi"));
        assert!(body["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn parse_generate_response() {
        let data = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "{\"step\":"}, {"text": "\"PLAN\",\"content\":\"x\"}"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 8, "totalTokenCount": 20},
            "modelVersion": "gemini-2.0-flash-exp"
        }"#;
        let parsed: GenerateResponse = serde_json::from_str(data).unwrap();
        let (text, usage, model) = GeminiProvider::extract_text(parsed).unwrap();
        assert_eq!(text, r#"{"step":"PLAN","content":"x"}"#);
        assert_eq!(usage.unwrap().total_tokens, 20);
        assert_eq!(model.as_deref(), Some("gemini-2.0-flash-exp"));
    }

    #[test]
    fn empty_candidate_is_invalid_response() {
        let data = r#"{"candidates": [{"finishReason": "SAFETY"}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(data).unwrap();
        let err = GeminiProvider::extract_text(parsed).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[tokio::test]
    async fn complete_round_trip_over_http() {
        let (base, server) = serve_once(
            200,
            "",
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"step\":\"OUTPUT\",\"content\":\"hi\"}"}]}}]}"#,
        )
        .await;

        let provider = GeminiProvider::new("test-key").with_base_url(&base);
        let response = provider
            .complete(ModelRequest::new("gemini-2.0-flash-exp", "say hi").with_schema(step_response_schema()))
            .await
            .unwrap();

        assert_eq!(response.text, r#"{"step":"OUTPUT","content":"hi"}"#);
        assert_eq!(response.model, "gemini-2.0-flash-exp");

        let raw_request = server.await.unwrap();
        assert!(raw_request.starts_with("POST /models/gemini-2.0-flash-exp:generateContent"));
        assert!(raw_request.to_lowercase().contains("x-goog-api-key: test-key"));
        assert!(raw_request.contains("say hi"));
    }

    #[tokio::test]
    async fn throttled_call_is_transient() {
        let (base, _server) = serve_once(
            429,
            "retry-after: 7\r\n",
            r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#,
        )
        .await;

        let provider = GeminiProvider::new("k").with_base_url(&base);
        let err = provider
            .complete(ModelRequest::new("m", "p"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited { retry_after_secs: 7 }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn server_error_is_fatal() {
        let (base, _server) = serve_once(
            500,
            "",
            r#"{"error":{"code":500,"message":"Internal error","status":"INTERNAL"}}"#,
        )
        .await;

        let provider = GeminiProvider::new("k").with_base_url(&base);
        let err = provider
            .complete(ModelRequest::new("m", "p"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::ApiError { status_code: 500, .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn oversized_prompt_is_fatal_despite_digits() {
        let (base, _server) = serve_once(
            400,
            "",
            r#"{"error":{"code":400,"message":"The input token count (34291) exceeds the maximum number of tokens allowed","status":"INVALID_ARGUMENT"}}"#,
        )
        .await;

        let provider = GeminiProvider::new("k").with_base_url(&base);
        let err = provider
            .complete(ModelRequest::new("m", "p"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::ApiError { status_code: 400, .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn refused_connection_is_fatal() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let provider = GeminiProvider::new("k").with_base_url(&base);
        let err = provider
            .complete(ModelRequest::new("gemini-429-test", "p"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Network(_)));
        assert!(!err.is_transient());
    }
}
