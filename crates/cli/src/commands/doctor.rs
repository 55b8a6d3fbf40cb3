//! `stepwise doctor` — Diagnose system health.

use std::path::Path;
use std::time::Duration;

use stepwise_config::AppConfig;
use stepwise_providers::build_from_config;
use stepwise_tools::default_registry;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 stepwise doctor — System Diagnostics");
    println!("======================================\n");

    let mut issues = 0;

    // Config
    let default_path = AppConfig::config_dir().join("config.toml");
    let path = config_path.unwrap_or(default_path.as_path());
    if path.exists() {
        println!("  ✅ Config file found at {}", path.display());
    } else {
        println!("  ℹ️  No config file at {}, using defaults", path.display());
    }

    let config = match crate::load_config(Some(path)) {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ {e}");
            println!("\n  ⚠️  Fix the config file and run doctor again.");
            return Ok(());
        }
    };

    println!(
        "  ℹ️  Provider: {}  Model: {}",
        config.default_provider,
        config.resolved_model()
    );

    // API key
    if config.has_api_key() {
        println!("  ✅ API key configured");
    } else {
        println!("  ⚠️  No API key — set GEMINI_API_KEY or add api_key to config.toml");
        issues += 1;
    }

    // Provider reachability
    match build_from_config(&config) {
        Ok(router) => match router.default() {
            Some(provider) => match tokio::time::timeout(HEALTH_TIMEOUT, provider.health_check()).await {
                Ok(Ok(true)) => println!("  ✅ Provider '{}' reachable", provider.name()),
                Ok(Ok(false)) => {
                    println!("  ⚠️  Provider '{}' answered but rejected the request", provider.name());
                    issues += 1;
                }
                Ok(Err(e)) => {
                    println!("  ❌ Provider '{}' unreachable: {e}", provider.name());
                    issues += 1;
                }
                Err(_) => {
                    println!("  ❌ Provider '{}' timed out", provider.name());
                    issues += 1;
                }
            },
            None => {
                println!("  ❌ No default provider configured");
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ {e}");
            issues += 1;
        }
    }

    // Tools
    let tools = default_registry(&config.tools);
    if tools.is_empty() {
        println!("  ⚠️  No tools enabled");
        issues += 1;
    } else {
        println!("  ✅ Tools: {}", tools.names().join(", "));
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
