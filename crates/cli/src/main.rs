//! AgentForge CLI, the main entry point.
//!
//! Commands:
//! - `serve`     Start the HTTP API server
//! - `run`       Run the prompt pipeline once
//! - `usage`     Show a user's token usage and cost
//! - `estimate`  Estimate the cost of a token count
//! - `doctor`    Diagnose configuration and storage

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "agentforge",
    about = "AgentForge: agent profiles, prompts and usage accounting",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run the prompt pipeline once and print the completion
    Run {
        /// What you want from the model
        #[arg(short, long)]
        intent: String,

        /// JSON file holding the agent profile
        #[arg(long, conflicts_with = "agent")]
        profile: Option<PathBuf>,

        /// Use the profile of a stored agent
        #[arg(long)]
        agent: Option<String>,

        /// User id the usage is recorded under
        #[arg(short, long, default_value = "cli")]
        user: String,

        /// Model to use instead of the configured default
        #[arg(short, long)]
        model: Option<String>,

        /// Upper bound on generated tokens
        #[arg(long)]
        max_tokens: Option<u32>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show recorded usage for a user
    Usage {
        /// User id to report on
        user_id: String,
    },

    /// Estimate the cost of a completion
    Estimate {
        tokens_input: u32,
        tokens_output: u32,
    },

    /// Diagnose configuration and storage
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing; stdout stays free for command output
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Run {
            intent,
            profile,
            agent,
            user,
            model,
            max_tokens,
            json,
        } => {
            let source = match (profile, agent) {
                (Some(path), _) => commands::run::ProfileSource::File(path),
                (None, Some(id)) => commands::run::ProfileSource::Agent(id),
                (None, None) => commands::run::ProfileSource::Empty,
            };
            commands::run::run(commands::run::RunArgs {
                intent,
                source,
                user,
                model,
                max_tokens,
                json,
            })
            .await?
        }
        Commands::Usage { user_id } => commands::usage::run(&user_id).await?,
        Commands::Estimate {
            tokens_input,
            tokens_output,
        } => commands::estimate::run(tokens_input, tokens_output)?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
