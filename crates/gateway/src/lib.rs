//! HTTP gateway for AgentForge.
//!
//! Exposes agent CRUD, the prompt pipeline, per-user usage, and two
//! diagnostic endpoints (`/selftest`, `/test`). Every response is a JSON
//! envelope `{ "ok": bool, "data"?: .., "error"?: .. }`.
//!
//! Built on Axum.

pub mod api;
pub mod selftest;

use std::sync::Arc;

use axum::Router;
use axum::http::{Method, header};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use agentforge_agent::PromptRunner;
use agentforge_config::AppConfig;
use agentforge_core::error::ProviderError;
use agentforge_core::store::AgentRepository;
use agentforge_providers::build_completion_client;
use agentforge_store::{FileAgentStore, FileUsageLog};
use agentforge_telemetry::{CostRates, UsageRecorder};

/// Shared application state.
pub struct AppState {
    pub agents: Arc<dyn AgentRepository>,
    pub runner: Arc<PromptRunner>,
    /// Model used when a request does not name one
    pub default_model: String,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(
        agents: Arc<dyn AgentRepository>,
        runner: Arc<PromptRunner>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            agents,
            runner,
            default_model: default_model.into(),
        }
    }

    /// Wire file-backed stores and the completion client from configuration.
    ///
    /// The client is built once here and shared by every request.
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        let agents = Arc::new(FileAgentStore::new(config.agents_path()));
        let usage = Arc::new(FileUsageLog::new(config.usage_path()));

        let client = Arc::new(build_completion_client(config)?);
        let recorder =
            Arc::new(UsageRecorder::new(usage).with_rates(CostRates::from(&config.pricing)));

        Ok(Self::new(
            agents,
            Arc::new(PromptRunner::new(client, recorder)),
            config.provider.default_model.clone(),
        ))
    }
}

/// Build the router with all routes, CORS and HTTP tracing.
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    api::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let state = Arc::new(AppState::from_config(&config)?);
    let app = build_router(state);

    info!(
        addr = %addr,
        data_dir = %config.storage.data_dir.display(),
        model = %config.provider.default_model,
        provider_configured = config.has_api_key(),
        "Gateway starting"
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
