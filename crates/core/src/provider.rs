//! Provider trait: the abstraction over chat-completion backends.
//!
//! A Provider knows how to send a list of chat messages to an LLM and get a
//! single completion back. Retry and backoff are layered on top by the
//! completion client in `agentforge-providers`, so implementations make
//! exactly one attempt per call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::ChatMessage;

/// Configuration for a provider request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "gpt-4o-mini")
    pub model: String,

    /// The chat messages, in order
    pub messages: Vec<ChatMessage>,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Text of the first choice; empty when the provider returned no choices
    pub text: String,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,

    /// The provider's response body, untouched
    #[serde(default)]
    pub raw: serde_json::Value,
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Normalized view of a completion, independent of the provider.
///
/// Token counts default to 0 when the provider omits usage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResult {
    pub text: String,
    pub tokens_input: u32,
    pub tokens_output: u32,
    pub raw: serde_json::Value,
}

impl From<ProviderResponse> for CompletionResult {
    fn from(response: ProviderResponse) -> Self {
        let usage = response.usage.unwrap_or_default();
        Self {
            text: response.text,
            tokens_input: usage.prompt_tokens,
            tokens_output: usage.completion_tokens,
            raw: response.raw,
        }
    }
}

/// The core Provider trait.
///
/// Every chat-completion backend implements this trait. The completion
/// client calls `complete()` without knowing which backend is in use.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_result_defaults_missing_usage_to_zero() {
        let response = ProviderResponse {
            text: "hi".into(),
            usage: None,
            model: "gpt-4o-mini".into(),
            raw: serde_json::Value::Null,
        };
        let result = CompletionResult::from(response);
        assert_eq!(result.text, "hi");
        assert_eq!(result.tokens_input, 0);
        assert_eq!(result.tokens_output, 0);
    }

    #[test]
    fn completion_result_copies_usage() {
        let response = ProviderResponse {
            text: String::new(),
            usage: Some(Usage {
                prompt_tokens: 12,
                completion_tokens: 7,
                total_tokens: 19,
            }),
            model: "gpt-4o-mini".into(),
            raw: serde_json::json!({"id": "cmpl-1"}),
        };
        let result = CompletionResult::from(response);
        assert_eq!(result.tokens_input, 12);
        assert_eq!(result.tokens_output, 7);
        assert_eq!(result.raw["id"], "cmpl-1");
    }

    #[test]
    fn request_skips_absent_max_tokens() {
        let req = ProviderRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![ChatMessage::user("hello")],
            max_tokens: None,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("max_tokens"));
    }
}
