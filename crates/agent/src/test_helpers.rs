//! Shared test doubles for runner tests.

use std::sync::{Arc, Mutex};

use agentforge_core::error::{ProviderError, StoreError};
use agentforge_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use agentforge_core::store::UsageLog;
use agentforge_core::usage::UsageRecord;
use agentforge_providers::CompletionClient;
use async_trait::async_trait;

/// Returns scripted outcomes in order and records every request.
///
/// Panics if called more times than it has outcomes.
pub struct ScriptedProvider {
    outcomes: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(mut outcomes: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        outcomes.reverse();
        Self {
            outcomes: Mutex::new(outcomes),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn text(text: &str, prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self::new(vec![Ok(text_response(text, prompt_tokens, completion_tokens))])
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        self.outcomes
            .lock()
            .unwrap()
            .pop()
            .expect("ScriptedProvider: no more outcomes")
    }
}

pub fn text_response(text: &str, prompt_tokens: u32, completion_tokens: u32) -> ProviderResponse {
    ProviderResponse {
        text: text.into(),
        usage: Some(Usage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }),
        model: "scripted-model".into(),
        raw: serde_json::json!({"id": "scripted"}),
    }
}

pub fn client_for(provider: Arc<ScriptedProvider>) -> CompletionClient {
    CompletionClient::new(provider).with_sleeper(Arc::new(NoSleep))
}

pub struct NoSleep;

#[async_trait]
impl agentforge_providers::Sleeper for NoSleep {
    async fn sleep(&self, _duration: std::time::Duration) {}
}

/// A usage log whose appends always fail.
pub struct FailingUsageLog;

#[async_trait]
impl UsageLog for FailingUsageLog {
    async fn append(&self, _record: UsageRecord) -> Result<(), StoreError> {
        Err(StoreError::Io {
            path: "token-usage.json".into(),
            reason: "read-only file system".into(),
        })
    }

    async fn list_all(&self) -> Result<Vec<UsageRecord>, StoreError> {
        Ok(Vec::new())
    }
}
