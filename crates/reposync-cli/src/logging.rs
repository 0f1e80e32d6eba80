//! Logging setup
//!
//! Logs go to stderr, or to `log_file` when configured, so they never mix
//! with JSON output on stdout.

use std::fs::OpenOptions;

use reposync_core::Config;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber
///
/// `RUST_LOG` wins when set; otherwise the configured level applies to the
/// reposync crates, raised by each `-v`.
pub fn init(config: &Config, verbose: u8) {
    let level = effective_level(&config.log_level, verbose);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("reposync_core={},reposync_cli={}", level, level))
    });

    if let Some(path) = &config.log_file {
        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("Warning: Could not open log file {:?}: {}", path, e);
                return;
            }
        };

        // Ignore error if already initialized
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_ansi(false)
            .with_writer(file)
            .try_init();
        debug!("logging to {:?}", path);
        return;
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn effective_level(configured: &str, verbose: u8) -> &str {
    match verbose {
        0 => configured,
        1 => "debug",
        _ => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_raises_level() {
        assert_eq!(effective_level("warn", 0), "warn");
        assert_eq!(effective_level("warn", 1), "debug");
        assert_eq!(effective_level("info", 3), "trace");
    }
}
