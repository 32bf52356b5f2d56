//! Colored output helpers for CLI
//!
//! Provides consistent, colored terminal output for the Scrivener CLI,
//! including the live view of a run's trace.

use crate::research::Stage;
use crate::types::{TraceEntry, TraceStatus};
use owo_colors::OwoColorize;

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    /// Print the Scrivener banner
    pub fn banner(&self) {
        let version = format!("v{}", env!("CARGO_PKG_VERSION"));
        if self.colored {
            println!(
                "\n   {} {}\n",
                "Scrivener".bright_cyan().bold(),
                version.dimmed()
            );
        } else {
            println!("\n   Scrivener {}\n", version);
        }
    }

    /// Print a success message with a checkmark
    pub fn success(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "✓".green().bold(), message.green());
        } else {
            println!("  [OK] {}", message);
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "•".blue(), message);
        } else {
            println!("  [INFO] {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            println!("  [WARN] {}", message);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// Print a header for a section
    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    /// Print a key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            println!("    {}: {}", key, value);
        }
    }

    /// Print a list item
    pub fn list_item(&self, item: &str) {
        if self.colored {
            println!("    {} {}", "•".blue(), item);
        } else {
            println!("    - {}", item);
        }
    }

    /// Print a hint/tip message
    pub fn hint(&self, message: &str) {
        if self.colored {
            println!("\n  {}", message.dimmed().italic());
        } else {
            println!("\n  [TIP] {}", message);
        }
    }

    /// Print newline
    pub fn newline(&self) {
        println!();
    }

    /// Print one live trace entry
    pub fn trace_entry(&self, entry: &TraceEntry) {
        println!("{}", self.format_trace_entry(entry));
    }

    fn format_trace_entry(&self, entry: &TraceEntry) -> String {
        let time = entry.timestamp.format("%H:%M:%S").to_string();
        let stage = format!("{:<12}", entry.stage.as_str());

        if !self.colored {
            let marker = match entry.status {
                TraceStatus::Entered => ">>",
                TraceStatus::Progress => "..",
                TraceStatus::Warning => "!!",
                TraceStatus::Completed => "OK",
                TraceStatus::Failed => "XX",
                TraceStatus::Cancelled => "--",
            };
            return format!("  {} {} {} {}", time, marker, stage, entry.message);
        }

        let stage = match entry.stage {
            Stage::Done => stage.green().bold().to_string(),
            Stage::Failed => stage.red().bold().to_string(),
            Stage::Cancelled => stage.yellow().bold().to_string(),
            _ => stage.cyan().to_string(),
        };
        let (marker, message) = match entry.status {
            TraceStatus::Entered => ("▶".bright_cyan().to_string(), entry.message.bright_white().to_string()),
            TraceStatus::Progress => ("•".blue().to_string(), entry.message.clone()),
            TraceStatus::Warning => ("⚠".yellow().bold().to_string(), entry.message.yellow().to_string()),
            TraceStatus::Completed => ("✓".green().bold().to_string(), entry.message.green().to_string()),
            TraceStatus::Failed => ("✗".red().bold().to_string(), entry.message.red().to_string()),
            TraceStatus::Cancelled => ("○".yellow().to_string(), entry.message.yellow().to_string()),
        };

        format!("  {} {} {} {}", time.dimmed(), marker, stage, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(stage: Stage, status: TraceStatus) -> TraceEntry {
        TraceEntry {
            stage,
            status,
            message: "Planned 6 queries".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_output_new() {
        assert!(Output::new().colored);
        assert!(Output::default().colored);
        assert!(!Output::no_color().colored);
    }

    #[test]
    fn test_plain_trace_entry() {
        let line = Output::no_color().format_trace_entry(&entry(Stage::Planning, TraceStatus::Warning));
        assert!(line.contains("!! PLANNING"));
        assert!(line.ends_with("Planned 6 queries"));
    }

    #[test]
    fn test_colored_trace_entry_keeps_text() {
        let line = Output::new().format_trace_entry(&entry(Stage::Done, TraceStatus::Completed));
        assert!(line.contains("DONE"));
        assert!(line.contains("Planned 6 queries"));
    }

    #[test]
    fn test_output_methods_no_panic() {
        // Smoke test - ensure none of the output methods panic
        for output in [Output::no_color(), Output::new()] {
            output.banner();
            output.success("test success");
            output.info("test info");
            output.warning("test warning");
            output.error("test error");
            output.header("Test Header");
            output.kv("key", "value");
            output.list_item("item");
            output.hint("hint message");
            output.trace_entry(&entry(Stage::Researching, TraceStatus::Progress));
        }
    }
}
