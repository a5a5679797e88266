//! `bariatric serve`: Start the HTTP API server.

use bariatric_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("Bariatric GPT Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Provider:  {} ({})", config.default_provider, config.default_model);
    println!("   Routes:    POST /v1/chat, POST /api/v1/invoke_agent_graph, GET /health");

    bariatric_gateway::start(config).await?;

    Ok(())
}
