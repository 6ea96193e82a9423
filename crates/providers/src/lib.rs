//! Chat-completion providers for AgentForge.
//!
//! Providers implement `agentforge_core::Provider` and make exactly one
//! request per call. The [`CompletionClient`] adds the retry policy on top
//! and is the only thing the rest of the system talks to.

pub mod client;
pub mod openai_compat;
pub mod retry;

use std::sync::Arc;
use std::time::Duration;

use agentforge_config::AppConfig;
use agentforge_core::error::ProviderError;

pub use client::CompletionClient;
pub use openai_compat::OpenAiCompatProvider;
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};

/// Build the shared completion client from configuration.
///
/// Without an API key the client is built unconfigured, so dispatch fails
/// fast with a configuration error while the rest of the app keeps working.
pub fn build_completion_client(config: &AppConfig) -> Result<CompletionClient, ProviderError> {
    let policy = RetryPolicy::from(&config.retry);

    let Some(api_key) = config.provider.api_key.as_deref() else {
        tracing::warn!("No provider API key configured; completions are disabled");
        return Ok(CompletionClient::unconfigured().with_policy(policy));
    };

    let provider = OpenAiCompatProvider::new(
        "openai",
        &config.provider.api_url,
        api_key,
        Duration::from_secs(config.provider.timeout_secs),
    )?;

    Ok(CompletionClient::new(Arc::new(provider)).with_policy(policy))
}
