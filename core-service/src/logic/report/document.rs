//! Report Document - rows + overflow detail pages, independent of output format.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::literal::{render_functions, render_insts};
use crate::constants::DEFAULT_OVERFLOW_CHARS;
use crate::logic::aggregate::{InstEntry, KernelAnomalyRecord};
use crate::logic::error::ConfigError;

/// Tabular column headers, in order
pub const COLUMNS: [&str; 4] = ["Folder", "NameOfKernel", "FunctionsRun", "INSTs"];

/// Longest slug segment kept in a detail page name
const SLUG_MAX: usize = 48;

/// When an INSTs cell is moved out to a detail page.
///
/// A cell exactly at the limit stays inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OverflowThreshold {
    /// Serialized literal length, in characters
    Chars(usize),
    /// Number of entries
    Entries(usize),
}

impl Default for OverflowThreshold {
    fn default() -> Self {
        OverflowThreshold::Chars(DEFAULT_OVERFLOW_CHARS)
    }
}

impl OverflowThreshold {
    pub fn exceeded_by(&self, literal: &str, entries: &[InstEntry]) -> bool {
        match *self {
            OverflowThreshold::Chars(limit) => literal.chars().count() > limit,
            OverflowThreshold::Entries(limit) => entries.len() > limit,
        }
    }
}

impl FromStr for OverflowThreshold {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (mode, limit) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| ConfigError::ThresholdSyntax(s.to_string()))?;
        let limit: usize = limit
            .trim()
            .parse()
            .map_err(|_| ConfigError::ThresholdSyntax(s.to_string()))?;
        if limit == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        match mode.trim() {
            "chars" => Ok(OverflowThreshold::Chars(limit)),
            "entries" => Ok(OverflowThreshold::Entries(limit)),
            _ => Err(ConfigError::ThresholdSyntax(s.to_string())),
        }
    }
}

impl TryFrom<String> for OverflowThreshold {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OverflowThreshold> for String {
    fn from(value: OverflowThreshold) -> Self {
        value.to_string()
    }
}

impl fmt::Display for OverflowThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowThreshold::Chars(n) => write!(f, "chars:{}", n),
            OverflowThreshold::Entries(n) => write!(f, "entries:{}", n),
        }
    }
}

/// One rendered row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    #[serde(rename = "Folder")]
    pub folder: String,
    #[serde(rename = "NameOfKernel")]
    pub kernel: String,
    #[serde(rename = "FunctionsRun")]
    pub functions: String,
    /// Full literal, always present in the tabular form
    #[serde(rename = "INSTs")]
    pub insts: String,
    /// Detail page holding the INSTs in the hierarchical form
    #[serde(skip)]
    pub detail: Option<String>,
    #[serde(skip)]
    pub entry_count: usize,
}

/// Full entry list of one overflowing row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailPage {
    pub file_name: String,
    pub folder: String,
    pub kernel: String,
    pub entries: Vec<InstEntry>,
    pub insts: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportDocument {
    pub rows: Vec<ReportRow>,
    pub details: Vec<DetailPage>,
}

impl ReportDocument {
    /// Render records (already in emission order) into rows and detail pages.
    pub fn build(records: &[KernelAnomalyRecord], threshold: OverflowThreshold) -> Self {
        let mut doc = ReportDocument::default();

        for record in records {
            let insts = render_insts(&record.entries);
            let detail = if threshold.exceeded_by(&insts, &record.entries) {
                let file_name = detail_file_name(&record.folder, &record.kernel);
                doc.details.push(DetailPage {
                    file_name: file_name.clone(),
                    folder: record.folder.clone(),
                    kernel: record.kernel.clone(),
                    entries: record.entries.clone(),
                    insts: insts.clone(),
                });
                Some(file_name)
            } else {
                None
            };

            doc.rows.push(ReportRow {
                folder: record.folder.clone(),
                kernel: record.kernel.clone(),
                functions: render_functions(&record.functions),
                insts,
                detail,
                entry_count: record.entries.len(),
            });
        }

        debug_assert!(doc.check_links().is_ok(), "detail page links are inconsistent");
        log::debug!("Built report: {} rows, {} detail pages", doc.rows.len(), doc.details.len());
        doc
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn detail(&self, file_name: &str) -> Option<&DetailPage> {
        self.details.iter().find(|d| d.file_name == file_name)
    }

    /// Every detail page is referenced by exactly one row and every
    /// reference resolves.
    pub fn check_links(&self) -> Result<(), String> {
        let mut referenced = HashSet::new();
        for row in &self.rows {
            if let Some(name) = &row.detail {
                if !referenced.insert(name.as_str()) {
                    return Err(format!("detail page {} referenced twice", name));
                }
                if self.detail(name).is_none() {
                    return Err(format!("row {}/{} links to missing page {}", row.folder, row.kernel, name));
                }
            }
        }
        if referenced.len() != self.details.len() {
            return Err(format!(
                "{} detail pages but {} referencing rows",
                self.details.len(),
                referenced.len()
            ));
        }
        Ok(())
    }
}

fn slug(value: &str) -> String {
    let mut out = String::new();
    for c in value.chars() {
        if out.len() >= SLUG_MAX {
            break;
        }
        if c.is_ascii_alphanumeric() || c == '-' {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Deterministic detail page name for a (folder, kernel) key.
pub fn detail_file_name(folder: &str, kernel: &str) -> String {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(folder.as_bytes());
    hasher.update(&[0x1f]);
    hasher.update(kernel.as_bytes());
    format!("{}__{}__{:08x}.html", slug(folder), slug(kernel), hasher.finalize())
}
