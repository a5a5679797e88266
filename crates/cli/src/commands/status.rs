//! `bariatric status`: Show effective configuration.

use bariatric_config::AppConfig;

fn on_off(enabled: bool) -> &'static str {
    if enabled { "enabled" } else { "disabled" }
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    println!("Bariatric GPT Status");
    println!("====================");
    println!("  Config dir:     {}", AppConfig::config_dir().display());
    println!("  Provider:       {}", config.default_provider);
    println!("  Model:          {}", config.default_model);
    println!("  Temperature:    {}", config.default_temperature);
    println!("  Gateway:        {}:{}", config.gateway.host, config.gateway.port);
    println!(
        "  Knowledge:      {} (top {})",
        config.knowledge.index_path.as_deref().unwrap_or("none"),
        config.knowledge.top_k
    );
    println!(
        "  Embeddings:     {}",
        config.knowledge.embedding_model.as_deref().unwrap_or("keyword search")
    );
    println!("  Nutrition:      {}", on_off(config.nutrition.enabled));
    println!(
        "  Profile store:  {}",
        config.profile_store.url.as_deref().unwrap_or("in-process")
    );
    println!("  Memory:         {}", on_off(config.memory.enabled));
    println!(
        "  Intent fallback: {}",
        on_off(config.meal_logging.llm_intent_fallback)
    );

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  Config file found");
    } else {
        println!("\n  No config file, using defaults (run `bariatric onboard`)");
    }

    Ok(())
}
