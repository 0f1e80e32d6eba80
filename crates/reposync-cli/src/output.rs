//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use reposync_core::{RepoRecord, SyncError, SyncState};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print the cached repository list
    pub fn print_records(&self, state: &SyncState) {
        let records = state.sorted_records();
        match self.format {
            OutputFormat::Human => {
                if records.is_empty() {
                    println!("No repositories found.");
                    return;
                }
                for record in &records {
                    let marker = if state.is_new(&record.id) { "*" } else { " " };
                    println!("{}{}", marker, format_record_line(record));
                }
                println!("\n{} repo(s)", records.len());
            }
            OutputFormat::Json => {
                let json: Vec<_> = records
                    .iter()
                    .map(|record| {
                        serde_json::json!({
                            "record": record,
                            "new": state.is_new(&record.id),
                        })
                    })
                    .collect();
                println!("{}", serde_json::Value::Array(json));
            }
            OutputFormat::Quiet => {
                for record in &records {
                    println!("{}", record.url);
                }
            }
        }
    }

    /// Print a non-fatal problem (e.g. one repo failed to load)
    pub fn advisory(&self, error: &SyncError) {
        match self.format {
            OutputFormat::Human => eprintln!("⚠ {}", error),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "warning", "message": error.to_string()})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print the session error, with a hint when there is one
    pub fn error(&self, error: &SyncError) {
        match self.format {
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "status": "error",
                        "message": error.to_string(),
                        "hint": error.user_hint(),
                    })
                );
            }
            OutputFormat::Human | OutputFormat::Quiet => {
                eprintln!("✗ {}", error);
                if let Some(hint) = error.user_hint() {
                    eprintln!("  {}", hint);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn format_record_line(record: &RepoRecord) -> String {
    format!(
        "{} | {} | {} | {} ({})",
        truncate(&record.qualified_name(), 30),
        truncate(&record.url, 45),
        record.last_edit_time,
        record.last_editor,
        truncate(&record.last_edit_device, 16)
    )
}

/// Truncate a string to max chars, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
