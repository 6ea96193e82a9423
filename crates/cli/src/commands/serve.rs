//! `agentforge serve`: start the HTTP API server.

use agentforge_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("AgentForge gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Data dir:  {}", config.storage.data_dir.display());
    println!("   Model:     {}", config.provider.default_model);
    if !config.has_api_key() {
        println!("   Provider:  not configured (set OPENAI_API_KEY to enable runs)");
    }

    agentforge_gateway::start(config).await?;

    Ok(())
}
