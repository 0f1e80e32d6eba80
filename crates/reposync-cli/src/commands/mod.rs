//! Command handlers

pub mod config;
pub mod repo;
pub mod watch;

use std::sync::Arc;

use anyhow::{Context, Result};

use reposync_core::{Config, HttpRepoService, RepoService};

/// Build the HTTP service client from configuration
pub fn connect(config: &Config) -> Result<Arc<dyn RepoService>> {
    let service = HttpRepoService::new(&config.server_url, config.request_timeout())
        .with_context(|| format!("Failed to set up client for {}", config.server_url))?;
    Ok(Arc::new(service))
}
