//! Completion client: a single chat-completion dispatch with bounded retry.
//!
//! The client is built once at startup and shared. It owns an optional
//! provider: `None` means no credential was configured, and every dispatch
//! then fails immediately with a configuration error without touching the
//! network.

use std::sync::Arc;

use agentforge_core::error::{Error, ProviderError, Result};
use agentforge_core::message::ChatMessage;
use agentforge_core::provider::{CompletionResult, Provider, ProviderRequest};
use tracing::{info, warn};

use crate::retry::{RetryPolicy, Sleeper, TokioSleeper};

/// Dispatches chat completions with retry and exponential backoff.
pub struct CompletionClient {
    provider: Option<Arc<dyn Provider>>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl CompletionClient {
    /// Create a client around a configured provider.
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider: Some(provider),
            policy: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// A client with no credential; every dispatch is a configuration error.
    pub fn unconfigured() -> Self {
        Self {
            provider: None,
            policy: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Send `messages` to `model`, retrying any failure with identical inputs.
    ///
    /// After the final attempt the last provider error is returned.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
        max_tokens: Option<u32>,
    ) -> Result<CompletionResult> {
        let provider = self.provider.as_ref().ok_or_else(|| {
            Error::config("provider API key is not set (OPENAI_API_KEY or AGENTFORGE_API_KEY)")
        })?;

        let request = ProviderRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            max_tokens,
        };

        let max_attempts = self.policy.max_attempts;
        let mut last_error =
            ProviderError::NotConfigured("completion was never attempted".into());

        for attempt in 1..=max_attempts {
            info!(
                provider = %provider.name(),
                attempt,
                max_attempts,
                model = %model,
                messages = messages.len(),
                "Dispatching completion"
            );

            match provider.complete(request.clone()).await {
                Ok(response) => {
                    let total = response.usage.map(|u| u.total_tokens).unwrap_or(0);
                    let result = CompletionResult::from(response);
                    info!(
                        tokens_input = result.tokens_input,
                        tokens_output = result.tokens_output,
                        total_tokens = total,
                        "Completion succeeded"
                    );
                    return Ok(result);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Completion attempt failed");
                    last_error = e;

                    if self.policy.should_retry(attempt) {
                        let delay = self.policy.delay_for(attempt);
                        info!(delay_ms = delay.as_millis() as u64, "Retrying completion");
                        self.sleeper.sleep(delay).await;
                    }
                }
            }
        }

        Err(Error::Provider(last_error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentforge_core::provider::{ProviderResponse, Usage};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Fails the first `failures` calls, then succeeds.
    struct FlakyProvider {
        failures: usize,
        calls: Mutex<usize>,
        seen: Mutex<Vec<ProviderRequest>>,
    }

    impl FlakyProvider {
        fn new(failures: usize) -> Self {
            Self {
                failures,
                calls: Mutex::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl Provider for FlakyProvider {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            self.seen.lock().unwrap().push(request);
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if *calls <= self.failures {
                return Err(ProviderError::ApiError {
                    status_code: 500,
                    message: format!("failure #{calls}"),
                });
            }
            Ok(ProviderResponse {
                text: "ok".into(),
                usage: Some(Usage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                    total_tokens: 15,
                }),
                model: "mock".into(),
                raw: serde_json::json!({"mock": true}),
            })
        }
    }

    /// Records requested delays instead of sleeping.
    #[derive(Default)]
    struct RecordingSleeper {
        delays: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.delays.lock().unwrap().push(duration);
        }
    }

    fn messages() -> Vec<ChatMessage> {
        vec![ChatMessage::system("sys"), ChatMessage::user("Intent: hi")]
    }

    #[tokio::test]
    async fn first_attempt_success_does_not_sleep() {
        let provider = Arc::new(FlakyProvider::new(0));
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = CompletionClient::new(provider.clone()).with_sleeper(sleeper.clone());

        let result = client.complete(&messages(), "mock", None).await.unwrap();
        assert_eq!(result.text, "ok");
        assert_eq!(result.tokens_input, 10);
        assert_eq!(result.tokens_output, 5);
        assert_eq!(provider.calls(), 1);
        assert!(sleeper.delays.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn fails_twice_then_succeeds() {
        let provider = Arc::new(FlakyProvider::new(2));
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = CompletionClient::new(provider.clone()).with_sleeper(sleeper.clone());

        let result = client.complete(&messages(), "mock", Some(64)).await.unwrap();
        assert_eq!(result.text, "ok");
        assert_eq!(provider.calls(), 3);
        assert_eq!(
            *sleeper.delays.lock().unwrap(),
            vec![Duration::from_millis(500), Duration::from_millis(1000)]
        );
    }

    #[tokio::test]
    async fn retries_use_identical_inputs() {
        let provider = Arc::new(FlakyProvider::new(2));
        let client = CompletionClient::new(provider.clone())
            .with_sleeper(Arc::new(RecordingSleeper::default()));

        client.complete(&messages(), "mock", Some(32)).await.unwrap();

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        for req in seen.iter() {
            assert_eq!(req.model, "mock");
            assert_eq!(req.max_tokens, Some(32));
            assert_eq!(req.messages, messages());
        }
    }

    #[tokio::test]
    async fn always_failing_surfaces_last_error_after_three_attempts() {
        let provider = Arc::new(FlakyProvider::new(usize::MAX));
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = CompletionClient::new(provider.clone()).with_sleeper(sleeper.clone());

        let err = client.complete(&messages(), "mock", None).await.unwrap_err();
        assert_eq!(provider.calls(), 3);
        match err {
            Error::Provider(ProviderError::ApiError { message, .. }) => {
                assert_eq!(message, "failure #3");
            }
            other => panic!("Expected final ApiError, got: {other:?}"),
        }
        // No sleep after the final attempt.
        assert_eq!(sleeper.delays.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn missing_credential_fails_fast() {
        let client = CompletionClient::unconfigured();
        assert!(!client.is_configured());
        let err = client.complete(&messages(), "mock", None).await.unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[tokio::test]
    async fn custom_policy_limits_attempts() {
        let provider = Arc::new(FlakyProvider::new(usize::MAX));
        let client = CompletionClient::new(provider.clone())
            .with_policy(RetryPolicy::new(1, Duration::from_millis(500)))
            .with_sleeper(Arc::new(RecordingSleeper::default()));

        assert!(client.complete(&messages(), "mock", None).await.is_err());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn real_backoff_waits_at_least_the_schedule() {
        let provider = Arc::new(FlakyProvider::new(2));
        let client = CompletionClient::new(provider.clone());

        let start = tokio::time::Instant::now();
        client.complete(&messages(), "mock", None).await.unwrap();

        assert_eq!(provider.calls(), 3);
        assert!(start.elapsed() >= Duration::from_millis(1500));
    }
}
