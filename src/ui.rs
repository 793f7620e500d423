use colored::Colorize;
use declarative::{Diagnostic, Severity};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Print a diagnostic raised for an entity
pub fn diagnostic(address: &str, diagnostic: &Diagnostic) {
    match diagnostic.severity {
        Severity::Error => eprintln!(
            "    {} {}: {}\n      {}",
            "✗".red(),
            address.bold(),
            diagnostic.summary.red(),
            diagnostic.detail
        ),
        Severity::Warning => println!(
            "    {} {}: {}\n      {}",
            "⚠".yellow(),
            address.bold(),
            diagnostic.summary.yellow(),
            diagnostic.detail.dimmed()
        ),
    }
}

/// Shorten long values for one-line display
pub fn truncate(value: &str, max_len: usize) -> String {
    if value.chars().count() <= max_len {
        value.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let kept: String = value.chars().take(max_len - 3).collect();
        format!("{kept}...")
    }
}

// ============================================================================
// Tests
// ============================================================================
