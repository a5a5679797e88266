//! `bariatric onboard`: First-time setup.

use bariatric_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("Bariatric GPT, first-time setup");
    println!("===============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("  Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n  Config already exists at: {}", config_path.display());
        println!("  Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("  Created config.toml at: {}", config_path.display());
    println!("\nNext steps:");
    println!("   1. Point default_provider at a running model (Ollama by default)");
    println!("   2. Optionally set [knowledge] index_path to a passage file");
    println!("   3. Optionally set [profile_store] url to your profile service");
    println!("   4. Run: bariatric chat\n");

    Ok(())
}
