//! `agentforge run`: one pass through the prompt pipeline.

use std::path::PathBuf;

use agentforge_agent::RunAgentPrompt;
use agentforge_config::AppConfig;
use agentforge_core::store::AgentRepository;
use agentforge_gateway::AppState;
use serde_json::Value;
use tracing::debug;

/// Where the agent profile comes from.
pub enum ProfileSource {
    File(PathBuf),
    Agent(String),
    Empty,
}

pub struct RunArgs {
    pub intent: String,
    pub source: ProfileSource,
    pub user: String,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub json: bool,
}

pub async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let state = AppState::from_config(&config)?;

    let profile = match args.source {
        ProfileSource::File(path) => {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
            serde_json::from_str::<Value>(&content)
                .map_err(|e| format!("{} is not valid JSON: {e}", path.display()))?
        }
        ProfileSource::Agent(id) => state
            .agents
            .get_by_id(&id)
            .await?
            .ok_or_else(|| format!("Agent not found: {id}"))?
            .profile_json
            .unwrap_or(Value::Null),
        ProfileSource::Empty => Value::Null,
    };

    let model = args.model.unwrap_or_else(|| state.default_model.clone());
    debug!(model = %model, user = %args.user, "Running prompt pipeline");

    let result = state
        .runner
        .run(RunAgentPrompt {
            profile,
            intent: args.intent,
            model,
            max_tokens: args.max_tokens,
            user_id: args.user,
        })
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.text);
        eprintln!(
            "\n{} in / {} out, est. ${:.6}",
            result.tokens_input,
            result.tokens_output,
            state
                .runner
                .recorder()
                .estimate_cost(result.tokens_input, result.tokens_output)
        );
    }

    Ok(())
}
