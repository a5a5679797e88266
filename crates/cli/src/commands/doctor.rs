//! `bariatric doctor`: Diagnose system health.

use bariatric_config::AppConfig;
use bariatric_core::provider::Provider;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("Bariatric GPT Doctor");
    println!("====================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  [warn] No config file, defaults apply (run `bariatric onboard`)");
        issues += 1;
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  [ok]   Configuration valid");
            config
        }
        Err(e) => {
            println!("  [fail] Configuration invalid: {e}");
            println!("\n  1 blocking issue found.");
            return Ok(());
        }
    };

    match bariatric_agent::builder::default_provider(&config) {
        Ok(provider) => match provider.health_check().await {
            Ok(true) => println!("  [ok]   Provider '{}' reachable", provider.name()),
            Ok(false) => {
                println!("  [warn] Provider '{}' responded but reports unhealthy", provider.name());
                issues += 1;
            }
            Err(e) => {
                println!("  [fail] Provider '{}' unreachable: {e}", provider.name());
                issues += 1;
            }
        },
        Err(e) => {
            println!("  [fail] {e}");
            issues += 1;
        }
    }

    match &config.knowledge.index_path {
        Some(path) if std::path::Path::new(path).exists() => {
            println!("  [ok]   Knowledge index found at {path}")
        }
        Some(path) => {
            println!("  [warn] Knowledge index missing at {path}, retrieval disabled");
            issues += 1;
        }
        None => println!("  [info] No knowledge index configured"),
    }

    if config.profile_store.url.is_none() {
        println!("  [info] Profile store is in-process; profiles reset on restart");
    }

    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
