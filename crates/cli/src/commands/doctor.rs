//! `agentforge doctor`: diagnose configuration and storage.

use agentforge_config::AppConfig;
use agentforge_core::store::{AgentRepository, UsageLog};
use agentforge_store::{FileAgentStore, FileUsageLog};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("AgentForge Doctor");
    println!("=================\n");

    let mut issues = 0;

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ok    Configuration loaded");
            config
        }
        Err(e) => {
            println!("  FAIL  Configuration invalid: {e}");
            println!("\n  1 issue(s) found. See above for details.");
            return Ok(());
        }
    };

    if config.has_api_key() {
        println!("  ok    Provider API key configured ({})", config.provider.api_url);
    } else {
        println!("  WARN  No provider API key; set OPENAI_API_KEY or AGENTFORGE_API_KEY");
        issues += 1;
    }
    println!("  ok    Default model: {}", config.provider.default_model);

    let agents = FileAgentStore::new(config.agents_path());
    match agents.list_all().await {
        Ok(list) => println!("  ok    {} ({} agents)", agents.path().display(), list.len()),
        Err(e) => {
            println!("  FAIL  Agents file unusable: {e}");
            issues += 1;
        }
    }

    let usage = FileUsageLog::new(config.usage_path());
    match usage.list_all().await {
        Ok(records) => println!("  ok    {} ({} records)", usage.path().display(), records.len()),
        Err(e) => {
            println!("  FAIL  Usage file unusable: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
