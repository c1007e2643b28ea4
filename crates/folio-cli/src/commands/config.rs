//! Config command handlers

use anyhow::{Context, Result};

use folio_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(output: &Output) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "content_root": config.content_root,
                    "backend": config.backend.to_string(),
                    "relay_url": config.relay_url,
                    "reload_delay_ms": config.reload_delay_ms,
                    "id_length": config.id_length,
                    "commit_timeout_secs": config.commit_timeout_secs
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.content_root.display());
        }
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  data_dir:            {}", config.data_dir.display());
            println!("  content_root:        {}", config.content_root.display());
            println!("  backend:             {}", config.backend);
            println!(
                "  relay_url:           {}",
                config.relay_url.as_deref().unwrap_or("(not set)")
            );
            println!("  reload_delay_ms:     {}", config.reload_delay_ms);
            println!("  id_length:           {}", config.id_length);
            println!(
                "  commit_timeout_secs: {}",
                config
                    .commit_timeout_secs
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Config file: {}", Config::config_file_path().display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(key: String, value: String, output: &Output) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;

    // "none" clears optional values, as an empty string does
    let value = if value == "none" { String::new() } else { value };
    config.set_value(&key, &value).context(
        "Valid keys: data_dir, content_root, backend, relay_url, reload_delay_ms, \
         id_length, commit_timeout_secs",
    )?;
    config.save().context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}
