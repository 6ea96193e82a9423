//! The prompt runner: build, dispatch, record.
//!
//! The three steps run strictly in that order for one invocation. A failed
//! usage write is logged and dropped; the completion result always wins
//! over bookkeeping.

use std::sync::Arc;

use agentforge_core::error::Result;
use agentforge_core::message::ChatMessage;
use agentforge_providers::CompletionClient;
use agentforge_telemetry::UsageRecorder;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::prompt::generate_prompt;

/// One pipeline invocation.
#[derive(Debug, Clone)]
pub struct RunAgentPrompt {
    pub profile: Value,
    pub intent: String,
    pub model: String,
    pub max_tokens: Option<u32>,
    pub user_id: String,
}

/// Completion output plus exactly what was sent.
#[derive(Debug, Clone, Serialize)]
pub struct RunAgentPromptResult {
    pub text: String,
    pub tokens_input: u32,
    pub tokens_output: u32,
    pub raw: Value,
    pub messages: Vec<ChatMessage>,
    pub prompt_text: String,
}

pub struct PromptRunner {
    client: Arc<CompletionClient>,
    recorder: Arc<UsageRecorder>,
}

impl PromptRunner {
    pub fn new(client: Arc<CompletionClient>, recorder: Arc<UsageRecorder>) -> Self {
        Self { client, recorder }
    }

    pub fn client(&self) -> &CompletionClient {
        &self.client
    }

    pub fn recorder(&self) -> &UsageRecorder {
        &self.recorder
    }

    pub async fn run(&self, request: RunAgentPrompt) -> Result<RunAgentPromptResult> {
        let prompt = generate_prompt(&request.profile, &request.intent);

        let completion = self
            .client
            .complete(&prompt.messages, &request.model, request.max_tokens)
            .await?;

        if let Err(e) = self
            .recorder
            .record_usage(
                &request.user_id,
                completion.tokens_input,
                completion.tokens_output,
                None,
            )
            .await
        {
            warn!(user_id = %request.user_id, error = %e, "Failed to record usage");
        }

        info!(
            user_id = %request.user_id,
            model = %request.model,
            tokens_input = completion.tokens_input,
            tokens_output = completion.tokens_output,
            "Prompt run complete"
        );

        Ok(RunAgentPromptResult {
            text: completion.text,
            tokens_input: completion.tokens_input,
            tokens_output: completion.tokens_output,
            raw: completion.raw,
            messages: prompt.messages,
            prompt_text: prompt.text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FailingUsageLog, ScriptedProvider, client_for, text_response};
    use agentforge_core::error::{Error, ProviderError};
    use agentforge_core::message::Role;
    use agentforge_core::provider::ProviderResponse;
    use agentforge_store::InMemoryUsageLog;
    use serde_json::json;

    fn request() -> RunAgentPrompt {
        RunAgentPrompt {
            profile: json!({"name": "Test", "prefs": {"lang": "es"}}),
            intent: "  Write a short greeting ".into(),
            model: "gpt-4o-mini".into(),
            max_tokens: Some(64),
            user_id: "user-1".into(),
        }
    }

    fn runner(provider: Arc<ScriptedProvider>, recorder: UsageRecorder) -> PromptRunner {
        PromptRunner::new(Arc::new(client_for(provider)), Arc::new(recorder))
    }

    #[tokio::test]
    async fn returns_completion_and_prompt() {
        let provider = Arc::new(ScriptedProvider::text("Hola!", 120, 8));
        let log = Arc::new(InMemoryUsageLog::new());
        let runner = runner(provider.clone(), UsageRecorder::new(log.clone()));

        let result = runner.run(request()).await.unwrap();
        assert_eq!(result.text, "Hola!");
        assert_eq!(result.tokens_input, 120);
        assert_eq!(result.tokens_output, 8);
        assert_eq!(result.raw["id"], "scripted");
        assert_eq!(result.messages.len(), 2);
        assert_eq!(result.messages[0].role, Role::System);
        assert!(result.prompt_text.starts_with("SYSTEM:\n"));

        let sent = provider.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].model, "gpt-4o-mini");
        assert_eq!(sent[0].max_tokens, Some(64));
        assert_eq!(sent[0].messages, result.messages);
    }

    #[tokio::test]
    async fn records_estimated_usage() {
        let provider = Arc::new(ScriptedProvider::text("ok", 1000, 1000));
        let recorder = UsageRecorder::new(Arc::new(InMemoryUsageLog::new()));
        let runner = runner(provider, recorder);

        runner.run(request()).await.unwrap();

        let history = runner.recorder().usage_by_user("user-1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].tokens_input, 1000);
        assert_eq!(history[0].cost, 0.02);
    }

    #[tokio::test]
    async fn usage_failure_does_not_fail_the_run() {
        let provider = Arc::new(ScriptedProvider::text("still fine", 5, 5));
        let runner = runner(provider, UsageRecorder::new(Arc::new(FailingUsageLog)));

        let result = runner.run(request()).await.unwrap();
        assert_eq!(result.text, "still fine");
    }

    #[tokio::test]
    async fn provider_failure_propagates_and_records_nothing() {
        let failure = || -> std::result::Result<ProviderResponse, ProviderError> {
            Err(ProviderError::ApiError {
                status_code: 503,
                message: "unavailable".into(),
            })
        };
        let provider = Arc::new(ScriptedProvider::new(vec![failure(), failure(), failure()]));
        let log = Arc::new(InMemoryUsageLog::new());
        let runner = runner(provider.clone(), UsageRecorder::new(log));

        let err = runner.run(request()).await.unwrap_err();
        assert!(matches!(err, Error::Provider(ProviderError::ApiError { status_code: 503, .. })));
        assert_eq!(provider.requests().len(), 3);
        assert!(runner.recorder().usage_by_user("user-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn recovers_after_transient_failure() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(ProviderError::Timeout("slow".into())),
            Ok(text_response("second try", 3, 2)),
        ]));
        let runner = runner(provider.clone(), UsageRecorder::new(Arc::new(InMemoryUsageLog::new())));

        let result = runner.run(request()).await.unwrap();
        assert_eq!(result.text, "second try");
        assert_eq!(provider.requests().len(), 2);
    }

    #[tokio::test]
    async fn missing_credential_is_config_error() {
        let runner = PromptRunner::new(
            Arc::new(CompletionClient::unconfigured()),
            Arc::new(UsageRecorder::new(Arc::new(InMemoryUsageLog::new()))),
        );
        let err = runner.run(request()).await.unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
