//! Output formatting for autoskope-cli (table, json, csv)

use clap::ValueEnum;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// ASCII table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
}

/// Context for output rendering
pub struct OutputContext {
    pub format: OutputFormat,
    pub quiet: bool,
}

impl OutputContext {
    pub fn new(format: OutputFormat, no_color: bool, quiet: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { format, quiet }
    }

    /// Print a success message (unless in quiet mode)
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg.green());
        }
    }

    /// Print an info message (unless in quiet mode)
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg);
        }
    }

    /// Print an error message
    pub fn error(&self, msg: &str) {
        eprintln!("{}", msg.red());
    }

    /// Print data in the configured format
    pub fn print<T: Tabled + Serialize>(&self, data: &[T]) {
        match self.format {
            OutputFormat::Table => {
                println!("{}", Table::new(data));
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(data).unwrap_or_else(|_| "[]".to_string())
                );
            }
            OutputFormat::Csv => {
                for line in render_csv(data) {
                    println!("{}", line);
                }
            }
        }
    }
}

/// Render data as CSV lines, header first, columns in field order
fn render_csv<T: Serialize>(data: &[T]) -> Vec<String> {
    let rows: Vec<serde_json::Value> = data
        .iter()
        .filter_map(|item| serde_json::to_value(item).ok())
        .collect();

    let Some(serde_json::Value::Object(first)) = rows.first() else {
        return Vec::new();
    };
    let headers: Vec<&str> = first.keys().map(|s| s.as_str()).collect();

    let mut lines = vec![headers.join(",")];
    for row in &rows {
        let values: Vec<String> = headers
            .iter()
            .map(|h| match row.get(*h) {
                Some(serde_json::Value::String(s)) => escape_csv(s),
                Some(serde_json::Value::Null) | None => String::new(),
                Some(other) => escape_csv(&other.to_string()),
            })
            .collect();
        lines.push(values.join(","));
    }
    lines
}

/// Escape a value for CSV output
fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

// =============================================================================
// Display types
// =============================================================================

/// Vehicle display for the vehicles command
#[derive(Debug, Tabled, Serialize)]
pub struct VehicleRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Model")]
    pub model: String,
    #[tabled(rename = "Latitude")]
    pub latitude: String,
    #[tabled(rename = "Longitude")]
    pub longitude: String,
    #[tabled(rename = "Speed")]
    pub speed: String,
    #[tabled(rename = "Parked")]
    pub parked: String,
    #[tabled(rename = "Last Fix")]
    pub timestamp: String,
    #[tabled(rename = "Ext. V")]
    pub external_voltage: String,
    #[tabled(rename = "Batt. V")]
    pub battery_voltage: String,
    #[tabled(rename = "HDOP")]
    pub gps_quality: String,
}
