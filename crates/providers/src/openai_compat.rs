//! OpenAI-compatible provider implementation.
//!
//! Works with OpenAI and any endpoint that exposes the
//! `/v1/chat/completions` API (OpenRouter, Ollama, vLLM, ...).
//!
//! One call is one HTTP request; retry lives in [`crate::CompletionClient`].

use std::time::Duration;

use agentforge_core::error::ProviderError;
use agentforge_core::message::ChatMessage;
use agentforge_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// An OpenAI-compatible chat-completion provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::new(
            "openai",
            "https://api.openai.com/v1",
            api_key,
            Duration::from_secs(60),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Convert our message types to the OpenAI wire format.
    fn to_api_messages(messages: &[ChatMessage]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.as_str().to_string(),
                content: Some(m.content.clone()),
            })
            .collect()
    }

    /// Normalize a parsed response body. Missing or empty `choices`, a
    /// message without `role` or `content`, and `null` token counts all
    /// degrade to empty text or zero rather than an error.
    fn parse_response(
        body: serde_json::Value,
        requested_model: &str,
    ) -> Result<ProviderResponse, ProviderError> {
        let api_response: ApiResponse = serde_json::from_value(body.clone())
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        let text = api_response
            .choices
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_default();

        let usage = api_response.usage.map(|u| {
            let prompt_tokens = u.prompt_tokens.unwrap_or(0);
            let completion_tokens = u.completion_tokens.unwrap_or(0);
            Usage {
                prompt_tokens,
                completion_tokens,
                total_tokens: u
                    .total_tokens
                    .unwrap_or(prompt_tokens.saturating_add(completion_tokens)),
            }
        });

        Ok(ProviderResponse {
            text,
            usage,
            model: api_response
                .model
                .unwrap_or_else(|| requested_model.to_string()),
            raw: body,
        })
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        debug!(provider = %self.name, model = %request.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            return Err(ProviderError::RateLimited { retry_after_secs });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if !(200..300).contains(&status) {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to read body: {e}")))?;

        Self::parse_response(json, &request.model)
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

/// Only the text of a returned message is read.
#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Option<Vec<ApiChoice>>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    #[serde(default)]
    message: Option<ApiResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: Option<u32>,
    #[serde(default)]
    completion_tokens: Option<u32>,
    #[serde(default)]
    total_tokens: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::post};

    /// Serve a single fixed response on `/v1/chat/completions` and return the base URL.
    async fn fake_server(status: StatusCode, body: serde_json::Value) -> String {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move || {
                let body = body.clone();
                async move { (status, Json(body)) }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    fn request() -> ProviderRequest {
        ProviderRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![ChatMessage::system("be brief"), ChatMessage::user("hi")],
            max_tokens: Some(64),
        }
    }

    fn provider(base_url: &str) -> OpenAiCompatProvider {
        OpenAiCompatProvider::new("test", base_url, "sk-test", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn openai_constructor() {
        let provider = OpenAiCompatProvider::openai("sk-test").unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.base_url(), "https://api.openai.com/v1");
    }

    #[test]
    fn trailing_slash_trimmed() {
        let provider = provider("http://localhost:8080/v1/");
        assert_eq!(provider.base_url(), "http://localhost:8080/v1");
    }

    #[test]
    fn message_conversion() {
        let messages = vec![ChatMessage::system("You are helpful"), ChatMessage::user("Hello")];
        let api_messages = OpenAiCompatProvider::to_api_messages(&messages);
        assert_eq!(api_messages.len(), 2);
        assert_eq!(api_messages[0].role, "system");
        assert_eq!(api_messages[1].role, "user");
        assert_eq!(api_messages[1].content.as_deref(), Some("Hello"));
    }

    #[test]
    fn parse_full_response() {
        let body = serde_json::json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini-2024-07-18",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Hola"}}],
            "usage": {"prompt_tokens": 20, "completion_tokens": 3, "total_tokens": 23}
        });
        let parsed = OpenAiCompatProvider::parse_response(body, "gpt-4o-mini").unwrap();
        assert_eq!(parsed.text, "Hola");
        assert_eq!(parsed.model, "gpt-4o-mini-2024-07-18");
        assert_eq!(parsed.usage.unwrap().total_tokens, 23);
        assert_eq!(parsed.raw["id"], "chatcmpl-1");
    }

    #[test]
    fn parse_zero_choices_yields_empty_text() {
        let body = serde_json::json!({"model": "gpt-4o-mini", "choices": []});
        let parsed = OpenAiCompatProvider::parse_response(body, "gpt-4o-mini").unwrap();
        assert_eq!(parsed.text, "");
        assert!(parsed.usage.is_none());
    }

    #[test]
    fn parse_null_token_counts_as_zero() {
        let body = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "ok"}}],
            "usage": {"prompt_tokens": null, "completion_tokens": 4, "total_tokens": null}
        });
        let parsed = OpenAiCompatProvider::parse_response(body, "gpt-4o-mini").unwrap();
        let usage = parsed.usage.unwrap();
        assert_eq!(usage.prompt_tokens, 0);
        assert_eq!(usage.completion_tokens, 4);
        assert_eq!(usage.total_tokens, 4);
    }

    #[test]
    fn parse_missing_token_counts_as_zero() {
        let body = serde_json::json!({"choices": [], "usage": {}});
        let usage = OpenAiCompatProvider::parse_response(body, "gpt-4o-mini")
            .unwrap()
            .usage
            .unwrap();
        assert_eq!(usage, Usage::default());
    }

    #[test]
    fn parse_message_without_role() {
        let body = serde_json::json!({"choices": [{"message": {"content": "hi"}}]});
        let parsed = OpenAiCompatProvider::parse_response(body, "gpt-4o-mini").unwrap();
        assert_eq!(parsed.text, "hi");
    }

    #[test]
    fn parse_null_choices_and_message() {
        for body in [
            serde_json::json!({"choices": null}),
            serde_json::json!({"choices": [{"message": null}]}),
            serde_json::json!({"choices": [{}]}),
        ] {
            let parsed = OpenAiCompatProvider::parse_response(body.clone(), "m").unwrap();
            assert_eq!(parsed.text, "", "body: {body}");
        }
    }

    #[test]
    fn parse_null_content_yields_empty_text() {
        let body = serde_json::json!({"choices": [{"message": {"role": "assistant", "content": null}}]});
        let parsed = OpenAiCompatProvider::parse_response(body, "fallback-model").unwrap();
        assert_eq!(parsed.text, "");
        assert_eq!(parsed.model, "fallback-model");
    }

    #[test]
    fn parse_non_object_is_invalid_response() {
        let result = OpenAiCompatProvider::parse_response(serde_json::json!([1, 2]), "m");
        assert!(matches!(result, Err(ProviderError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn completes_against_local_server() {
        let base = fake_server(
            StatusCode::OK,
            serde_json::json!({
                "model": "gpt-4o-mini",
                "choices": [{"message": {"role": "assistant", "content": "pong"}}],
                "usage": {"prompt_tokens": 9, "completion_tokens": 1, "total_tokens": 10}
            }),
        )
        .await;

        let response = provider(&base).complete(request()).await.unwrap();
        assert_eq!(response.text, "pong");
        assert_eq!(response.usage.unwrap().prompt_tokens, 9);
    }

    #[tokio::test]
    async fn server_error_maps_to_api_error() {
        let base = fake_server(
            StatusCode::INTERNAL_SERVER_ERROR,
            serde_json::json!({"error": {"message": "boom"}}),
        )
        .await;

        match provider(&base).complete(request()).await {
            Err(ProviderError::ApiError { status_code, message }) => {
                assert_eq!(status_code, 500);
                assert!(message.contains("boom"));
            }
            other => panic!("Expected ApiError, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unauthorized_maps_to_authentication_failed() {
        let base = fake_server(StatusCode::UNAUTHORIZED, serde_json::json!({})).await;
        let result = provider(&base).complete(request()).await;
        assert!(matches!(result, Err(ProviderError::AuthenticationFailed(_))));
    }

    #[tokio::test]
    async fn rate_limit_maps_to_rate_limited() {
        let base = fake_server(StatusCode::TOO_MANY_REQUESTS, serde_json::json!({})).await;
        let result = provider(&base).complete(request()).await;
        assert!(matches!(result, Err(ProviderError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        // Port 9 (discard) on localhost is essentially never listening.
        let result = provider("http://127.0.0.1:9/v1").complete(request()).await;
        assert!(matches!(
            result,
            Err(ProviderError::Network(_)) | Err(ProviderError::Timeout(_))
        ));
    }
}
