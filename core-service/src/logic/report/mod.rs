//! Report Module - rendering of aggregated kernel records
//!
//! ## Structure
//! - `literal.rs` - INSTs / FunctionsRun literal encoding (and decoding)
//! - `document.rs` - ReportDocument: rows + overflow detail pages
//! - `exporter.rs` - tabular output (CSV, JSONL, JSON)
//! - `html.rs` - hierarchical output (index + detail pages)

pub mod literal;
pub mod document;
pub mod exporter;
pub mod html;


use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::logic::error::TraceResult;

pub use document::{detail_file_name, DetailPage, OverflowThreshold, ReportDocument, ReportRow, COLUMNS};
pub use exporter::{export_rows, render_tabular, ExportFormat};
pub use html::{render_detail, render_index, write_hierarchical};
pub use literal::{parse_insts, render_entry, render_functions, render_insts};

/// Base name of the tabular report file
pub const TABULAR_STEM: &str = "kernel_anomalies";

/// Files produced by one render
#[derive(Debug, Clone, Serialize)]
pub struct ReportArtifacts {
    pub tabular: PathBuf,
    pub index: PathBuf,
    pub details: Vec<PathBuf>,
    pub rows: usize,
}

/// Write both report forms into `out_dir`.
pub fn write_report(doc: &ReportDocument, out_dir: &Path, format: ExportFormat) -> TraceResult<ReportArtifacts> {
    std::fs::create_dir_all(out_dir)?;

    let tabular = out_dir.join(format!("{}.{}", TABULAR_STEM, format.extension()));
    let rows = export_rows(doc, &tabular, format)?;
    let (index, details) = write_hierarchical(doc, out_dir)?;

    Ok(ReportArtifacts { tabular, index, details, rows })
}
