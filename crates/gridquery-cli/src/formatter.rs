//! Output formatters for grid pages.

use clap::ValueEnum;
use comfy_table::{Cell, Table};
use gridquery_proto::{DisplayRow, GridResponse, ProtocolVersion};

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON envelope as a grid client receives it
    Json,
    /// CSV format
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter {
    /// Format one grid page. `columns` are the requested column paths.
    fn format_response(
        &self,
        response: &GridResponse,
        columns: &[String],
        version: ProtocolVersion,
    ) -> String;

    /// Format an error message.
    fn format_error(&self, error: &str) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Csv => Box::new(CsvFormatter),
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_response(
        &self,
        response: &GridResponse,
        columns: &[String],
        _version: ProtocolVersion,
    ) -> String {
        let mut table = Table::new();
        table.set_header(columns.iter().map(Cell::new).collect::<Vec<_>>());

        for row in &response.data {
            let cells: Vec<Cell> = columns
                .iter()
                .map(|path| Cell::new(format_cell(row, path)))
                .collect();
            table.add_row(cells);
        }

        format!(
            "{}\n{} row(s), {} of {} record(s) match",
            table,
            response.data.len(),
            response.display_records,
            response.total_records
        )
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}", error)
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_response(
        &self,
        response: &GridResponse,
        _columns: &[String],
        version: ProtocolVersion,
    ) -> String {
        serde_json::to_string_pretty(&response.to_envelope(version))
            .unwrap_or_else(|_| "{}".to_string())
    }

    fn format_error(&self, error: &str) -> String {
        serde_json::json!({
            "error": error
        })
        .to_string()
    }
}

/// CSV formatter.
pub struct CsvFormatter;

impl Formatter for CsvFormatter {
    fn format_response(
        &self,
        response: &GridResponse,
        columns: &[String],
        _version: ProtocolVersion,
    ) -> String {
        let header: Vec<String> = columns
            .iter()
            .map(|path| format!("\"{}\"", escape_csv(path)))
            .collect();
        let mut output = header.join(",");
        output.push('\n');
        for row in &response.data {
            let cells: Vec<String> = columns
                .iter()
                .map(|path| format!("\"{}\"", escape_csv(&format_cell(row, path))))
                .collect();
            output.push_str(&cells.join(","));
            output.push('\n');
        }
        output
    }

    fn format_error(&self, error: &str) -> String {
        format!("error\n\"{}\"", escape_csv(error))
    }
}

/// Text of the value at a dotted path of a display row.
fn format_cell(row: &DisplayRow, path: &str) -> String {
    let mut segments = path.split('.');
    let Some(first) = segments.next() else {
        return String::new();
    };
    let mut current = row.get(first);
    for segment in segments {
        current = current.and_then(|v| v.get(segment));
    }
    current.map(format_value).unwrap_or_default()
}

/// Format a JSON value as display text.
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(format_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

/// Escape a string for CSV.
fn escape_csv(s: &str) -> String {
    s.replace('"', "\"\"")
}
