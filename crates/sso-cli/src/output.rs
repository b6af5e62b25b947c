//! Output formatting utilities.

use colored::Colorize;

use crate::cli::OutputFormat;

/// Prints a success message.
pub fn success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Prints an error message.
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Prints a warning message.
pub fn warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}

/// Prints an info message.
pub fn info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Prints a section heading.
pub fn heading(title: &str) {
    println!("{}", format!("=== {title} ===").bold());
}

/// Prints a labelled value.
pub fn field(label: &str, value: &str) {
    println!("  {:<24} {}", format!("{label}:").dimmed(), value);
}

/// Outputs a single item.
///
/// Text output prints the item as indented `key: value` lines.
pub fn output_single<T: serde::Serialize>(item: &T, format: OutputFormat) -> crate::CliResult<()> {
    match format {
        OutputFormat::Text => print_text_value(&serde_json::to_value(item)?, 0),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(item)?),
    }
    Ok(())
}

fn print_text_value(value: &serde_json::Value, indent: usize) {
    let prefix = "  ".repeat(indent);

    match value {
        serde_json::Value::Array(arr) => {
            for item in arr {
                print!("{prefix}- ");
                print_text_value(item, indent + 1);
            }
        }
        serde_json::Value::Object(map) => {
            for (key, val) in map {
                if val.is_object() || val.is_array() {
                    println!("{prefix}{key}:");
                    print_text_value(val, indent + 1);
                } else {
                    println!("{prefix}{key}: {}", scalar(val));
                }
            }
        }
        other => println!("{}", scalar(other)),
    }
}

fn scalar(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Formats a Unix timestamp for display.
#[must_use]
pub fn timestamp(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .map_or_else(|| "Invalid timestamp".to_string(), |dt| {
            dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
        })
}
