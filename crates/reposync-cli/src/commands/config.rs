//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use reposync_core::{Config, Layout};

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "server_url": config.server_url,
                    "notify_url": config.notify_url,
                    "layout": config.layout.to_string(),
                    "request_timeout_secs": config.request_timeout_secs,
                    "log_level": config.log_level,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.server_url);
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  server_url:           {}", config.server_url);
            println!(
                "  notify_url:           {}",
                config.notify_url.as_deref().unwrap_or("(not set)")
            );
            println!("  layout:               {}", config.layout);
            println!("  request_timeout_secs: {}", config.request_timeout_secs);
            println!("  log_level:            {}", config.log_level);
            println!(
                "  log_file:             {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "server_url" => {
            if value.is_empty() {
                bail!("server_url must not be empty");
            }
            config.server_url = value.to_string();
        }
        "notify_url" => {
            config.notify_url = optional(value);
        }
        "layout" => {
            config.layout = value
                .parse::<Layout>()
                .map_err(|e: String| anyhow::anyhow!(e))?;
        }
        "request_timeout_secs" => {
            config.request_timeout_secs = value
                .parse()
                .context("Invalid value for request_timeout_secs. Use a whole number of seconds.")?;
        }
        "log_level" => {
            config.log_level = value.to_string();
        }
        "log_file" => {
            config.log_file = optional(value).map(PathBuf::from);
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: server_url, notify_url, layout, request_timeout_secs, log_level, log_file",
                key
            );
        }
    }
    Ok(())
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value.to_string())
    }
}
