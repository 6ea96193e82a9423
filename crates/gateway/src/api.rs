//! Route handlers and the JSON envelope.
//!
//! Request bodies are parsed leniently: anything that is not valid JSON is
//! treated as `{}` and then fails field validation with a 400.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::{Value, json};
use tracing::{error, info, warn};

use agentforge_agent::RunAgentPrompt;
use agentforge_core::agent::{AgentPatch, NewAgent};
use agentforge_core::error::Error;
use agentforge_core::message::ChatMessage;
use agentforge_core::store::AgentRepository;

use crate::SharedState;
use crate::selftest::selftest_handler;

/// User id recorded when a run request does not name one.
pub const ANONYMOUS_USER: &str = "anonymous";

/// Prompt sent by the provider smoke test.
pub const SMOKE_TEST_PROMPT: &str = "Hello, AgentForge test";

const SMOKE_TEST_MAX_TOKENS: u32 = 200;

/// Fields a PUT body must mention at least one of.
const UPDATABLE_FIELDS: [&str; 3] = ["name", "description", "profileJSON"];

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/agents", get(list_agents_handler).post(create_agent_handler))
        .route(
            "/agents/{id}",
            get(get_agent_handler)
                .put(update_agent_handler)
                .delete(delete_agent_handler),
        )
        .route("/agents/{id}/run", axum::routing::post(run_agent_handler))
        .route("/usage/{user_id}", get(usage_handler))
        .route("/selftest", get(selftest_handler))
        .route("/test", get(smoke_test_handler))
        .with_state(state)
}

// --- Envelope ---

/// A failed request: status plus a short, client-safe message.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Log `e` and reply 500 with `context` only.
    pub fn internal<E: std::fmt::Display>(context: &'static str) -> impl FnOnce(E) -> Self {
        move |e| {
            error!(error = %e, "{context}");
            Self::new(StatusCode::INTERNAL_SERVER_ERROR, context)
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::Validation(message) => Self::validation(message),
            Error::NotFound(message) => Self::not_found(message),
            Error::Config { message } => {
                warn!(%message, "Request needs an unconfigured provider");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Provider API key is not configured",
                )
            }
            Error::Provider(e) => ApiError::internal("Provider request failed")(e),
            other => ApiError::internal("Internal error")(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "ok": false, "error": self.message })),
        )
            .into_response()
    }
}

pub type ApiResult = Result<(StatusCode, Json<Value>), ApiError>;

fn ok(data: impl serde::Serialize) -> ApiResult {
    ok_with(StatusCode::OK, data)
}

fn ok_with(status: StatusCode, data: impl serde::Serialize) -> ApiResult {
    let data = serde_json::to_value(data).map_err(ApiError::internal("Failed to encode response"))?;
    Ok((status, Json(json!({ "ok": true, "data": data }))))
}

/// Parse a request body, treating anything malformed as `{}`.
pub fn parse_body(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap_or_else(|_| json!({}))
}

// --- Health ---

async fn health_handler() -> Json<Value> {
    Json(json!({
        "ok": true,
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// --- Agents ---

async fn list_agents_handler(State(state): State<SharedState>) -> ApiResult {
    let agents = state
        .agents
        .list_all()
        .await
        .map_err(ApiError::internal("Failed to read agents"))?;
    ok(agents)
}

/// Validate a create body: `name` must be a non-blank string.
pub fn parse_new_agent(body: &Value) -> Result<NewAgent, ApiError> {
    let name = body
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();
    if name.is_empty() {
        return Err(ApiError::validation("'name' is required and must be a string"));
    }

    Ok(NewAgent {
        name: name.to_string(),
        description: body
            .get("description")
            .and_then(Value::as_str)
            .map(String::from),
        profile_json: body.get("profileJSON").cloned(),
    })
}

async fn create_agent_handler(State(state): State<SharedState>, body: Bytes) -> ApiResult {
    let input = parse_new_agent(&parse_body(&body))?;
    let agent = state
        .agents
        .create(input)
        .await
        .map_err(ApiError::internal("Failed to create agent"))?;
    info!(id = %agent.id, name = %agent.name, "Agent created");
    ok_with(StatusCode::CREATED, agent)
}

async fn get_agent_handler(State(state): State<SharedState>, Path(id): Path<String>) -> ApiResult {
    let agent = state
        .agents
        .get_by_id(&id)
        .await
        .map_err(ApiError::internal("Failed to read agent"))?
        .ok_or_else(|| ApiError::not_found("Agent not found"))?;
    ok(agent)
}

/// Validate an update body: it must mention at least one updatable field.
///
/// Non-string `name`/`description` values count as mentioned but are not
/// applied. `name` is trimmed. `profileJSON` is applied whatever its type.
pub fn parse_agent_patch(body: &Value) -> Result<AgentPatch, ApiError> {
    let Some(fields) = body.as_object() else {
        return Err(ApiError::validation("At least one updatable field is required"));
    };
    if !UPDATABLE_FIELDS.iter().any(|f| fields.contains_key(*f)) {
        return Err(ApiError::validation("At least one updatable field is required"));
    }

    Ok(AgentPatch {
        name: fields
            .get("name")
            .and_then(Value::as_str)
            .map(|n| n.trim().to_string()),
        description: fields
            .get("description")
            .and_then(Value::as_str)
            .map(String::from),
        profile_json: fields.get("profileJSON").cloned(),
    })
}

async fn update_agent_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult {
    // Payload validation comes before the existence check.
    let patch = parse_agent_patch(&parse_body(&body))?;

    let exists = state
        .agents
        .get_by_id(&id)
        .await
        .map_err(ApiError::internal("Failed to update agent"))?;
    if exists.is_none() {
        return Err(ApiError::not_found("Agent not found"));
    }

    let updated = state
        .agents
        .update(&id, patch)
        .await
        .map_err(ApiError::internal("Failed to update agent"))?
        .ok_or_else(|| ApiError::not_found("Agent not found"))?;
    ok(updated)
}

async fn delete_agent_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let deleted = state
        .agents
        .delete(&id)
        .await
        .map_err(ApiError::internal("Failed to delete agent"))?;
    if !deleted {
        return Err(ApiError::not_found("Agent not found"));
    }
    info!(id = %id, "Agent deleted");
    Ok(Json(json!({ "ok": true })))
}

// --- Pipeline ---

/// Fields of a run body other than the profile, which comes from the agent.
#[derive(Debug, PartialEq)]
pub struct RunFields {
    pub intent: String,
    pub user_id: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
}

pub fn parse_run_fields(body: &Value) -> Result<RunFields, ApiError> {
    let intent = body
        .get("intent")
        .and_then(Value::as_str)
        .filter(|i| !i.trim().is_empty())
        .ok_or_else(|| ApiError::validation("'intent' is required and must be a string"))?;

    let max_tokens = match body.get("max_tokens") {
        None | Some(Value::Null) => None,
        Some(v) => Some(
            v.as_u64()
                .filter(|n| *n > 0)
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| ApiError::validation("'max_tokens' must be a positive integer"))?,
        ),
    };

    let text = |key: &str| {
        body.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    };

    Ok(RunFields {
        intent: intent.to_string(),
        user_id: text("userId"),
        model: text("model"),
        max_tokens,
    })
}

async fn run_agent_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult {
    let fields = parse_run_fields(&parse_body(&body))?;

    let agent = state
        .agents
        .get_by_id(&id)
        .await
        .map_err(ApiError::internal("Failed to read agent"))?
        .ok_or_else(|| ApiError::not_found("Agent not found"))?;

    let result = state
        .runner
        .run(RunAgentPrompt {
            profile: agent.profile_json.unwrap_or_else(|| json!({})),
            intent: fields.intent,
            model: fields.model.unwrap_or_else(|| state.default_model.clone()),
            max_tokens: fields.max_tokens,
            user_id: fields.user_id.unwrap_or_else(|| ANONYMOUS_USER.to_string()),
        })
        .await?;
    ok(result)
}

async fn usage_handler(State(state): State<SharedState>, Path(user_id): Path<String>) -> ApiResult {
    let recorder = state.runner.recorder();
    let records = recorder.usage_by_user(&user_id).await?;
    let summary = agentforge_telemetry::summarize(&user_id, &records);
    ok(json!({ "records": records, "summary": summary }))
}

// --- Diagnostics ---

/// Send one fixed message straight to the provider.
async fn smoke_test_handler(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    let messages = [ChatMessage::user(SMOKE_TEST_PROMPT)];
    let completion = state
        .runner
        .client()
        .complete(&messages, &state.default_model, Some(SMOKE_TEST_MAX_TOKENS))
        .await?;
    Ok(Json(json!({ "ok": true, "message": completion.text })))
}
