//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use tuner_lib::Severity;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Color a severity label for terminal output
pub fn color_severity(severity: Severity) -> String {
    let label = severity.to_string();
    match severity {
        Severity::Pass => label.green().to_string(),
        Severity::Info => label.blue().to_string(),
        Severity::Warning => label.yellow().to_string(),
        Severity::Critical => label.red().bold().to_string(),
    }
}

/// Format a byte count as a human-readable string
#[allow(dead_code)]
pub fn format_bytes(bytes: i64) -> String {
    const KB: i64 = 1024;
    const MB: i64 = KB * 1024;
    const GB: i64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2}Gi", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2}Mi", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2}Ki", bytes as f64 / KB as f64)
    } else {
        format!("{}B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512B");
        assert_eq!(format_bytes(16384), "16.00Ki");
        assert_eq!(format_bytes(16777216), "16.00Mi");
        assert_eq!(format_bytes(6442450944), "6.00Gi");
    }

    #[test]
    fn test_color_severity_contains_label() {
        for severity in [
            Severity::Pass,
            Severity::Info,
            Severity::Warning,
            Severity::Critical,
        ] {
            assert!(color_severity(severity).contains(&severity.to_string()));
        }
    }
}
