use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use telemetry_pipeline::config::{self, ProviderConfig};
use tracing::info;

/// Load the configuration file, or fall back to built-in defaults
pub fn load_or_default(path: Option<&Path>) -> Result<ProviderConfig> {
    match path {
        Some(path) => config::load_config(path),
        None => {
            info!("No configuration file given, using defaults");
            Ok(ProviderConfig::default())
        }
    }
}

/// Execute the config show command
///
/// Displays the effective configuration with header values masked
pub fn show(path: Option<&Path>) -> Result<()> {
    println!("{}", "Loading configuration...".yellow());
    info!("Loading configuration for display");

    let cfg = load_or_default(path)?;
    let sanitized = sanitize_secrets(&cfg);

    println!("{}", "Current Configuration:".green().bold());
    println!();

    let toml_string = toml::to_string_pretty(&sanitized)?;
    println!("{}", toml_string);

    info!("Configuration displayed successfully");
    Ok(())
}

/// Execute the config validate command
pub fn validate(path: Option<&Path>) -> Result<()> {
    println!("{}", "Validating configuration...".yellow());
    info!("Validating configuration file");

    let cfg = load_or_default(path)?;

    println!("{}", "✓ Configuration is valid".green());
    println!();
    println!("{}", "Summary:".bold());
    println!("  Service: {}", cfg.service_name);
    println!("  Protocol: {}", cfg.protocol);
    println!(
        "  Batching: {}",
        if cfg.batching_enabled {
            format!("{} items / {} ms", cfg.batch_size, cfg.timeout_ms)
        } else {
            "disabled".to_string()
        }
    );
    println!("  Default Tags: {}", cfg.default_tags.len());

    info!("Configuration validation successful");
    Ok(())
}

/// Header values usually carry credentials (e.g. `Authorization`)
fn sanitize_secrets(cfg: &ProviderConfig) -> ProviderConfig {
    let mut sanitized = cfg.clone();
    for header in &mut sanitized.headers {
        header.value = mask_secret(&header.value);
    }
    sanitized
}

/// Shows first 7 and last 4 characters with an ellipsis in between
/// Example: "Bearer abcdef123456" -> "Bearer ...3456"
fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 11 {
        return "***".to_string();
    }

    let prefix: String = chars[..7].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", prefix, suffix)
}
