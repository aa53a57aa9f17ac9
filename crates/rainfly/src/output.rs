//! Table / JSON rendering helpers.

use owo_colors::OwoColorize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Render rows as a rounded table, or JSON when `--json` is set.
pub fn print_rows<T: Tabled + serde::Serialize>(rows: Vec<T>, json: bool) {
    if json {
        match serde_json::to_string_pretty(&rows) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("failed to render JSON: {e}"),
        }
        return;
    }
    if rows.is_empty() {
        println!("{}", "(no entries)".dimmed());
        return;
    }
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

/// Render an arbitrary JSON value.
pub fn print_value(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("failed to render JSON: {e}"),
    }
}

/// Success line with a green check.
pub fn success(message: &str) {
    println!("{} {message}", "✓".green());
}

/// Qualified-success line for partial batch failures.
pub fn partial(message: &str) {
    println!("{} {message}", "!".yellow());
}
