//! Tabular Exporter
//!
//! Writes the four-column table (Folder, NameOfKernel, FunctionsRun, INSTs).
//! The tabular form always carries the full INSTs literal.

use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::document::{ReportDocument, COLUMNS};
use crate::logic::error::{ConfigError, TraceResult};

// ============================================================================
// EXPORT FORMATS
// ============================================================================

/// Supported tabular formats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Spreadsheet friendly, every field quoted
    #[default]
    Csv,
    /// One JSON object per row
    Jsonl,
    /// Pretty JSON array
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Jsonl => "jsonl",
            ExportFormat::Json => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "jsonl" => Ok(ExportFormat::Jsonl),
            "json" => Ok(ExportFormat::Json),
            other => Err(ConfigError::UnknownFormat(other.to_string())),
        }
    }
}

// ============================================================================
// EXPORT FUNCTIONS
// ============================================================================

/// Render the table in memory
pub fn render_tabular(doc: &ReportDocument, format: ExportFormat) -> TraceResult<String> {
    let mut out = String::new();

    match format {
        ExportFormat::Csv => {
            out.push_str(&COLUMNS.join(","));
            out.push('\n');
            for row in &doc.rows {
                let _ = writeln!(
                    out,
                    "{},{},{},{}",
                    csv_field(&row.folder),
                    csv_field(&row.kernel),
                    csv_field(&row.functions),
                    csv_field(&row.insts)
                );
            }
        }
        ExportFormat::Jsonl => {
            for row in &doc.rows {
                out.push_str(&serde_json::to_string(row)?);
                out.push('\n');
            }
        }
        ExportFormat::Json => {
            out = serde_json::to_string_pretty(&doc.rows)?;
            out.push('\n');
        }
    }

    Ok(out)
}

/// Write the table to `destination`, returning the row count
pub fn export_rows(doc: &ReportDocument, destination: &Path, format: ExportFormat) -> TraceResult<usize> {
    let body = render_tabular(doc, format)?;
    let mut file = std::fs::File::create(destination)?;
    file.write_all(body.as_bytes())?;
    file.flush()?;

    log::info!("Exported {} rows to {}", doc.rows.len(), destination.display());
    Ok(doc.rows.len())
}

/// Quote a CSV field, doubling embedded quotes
fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}
