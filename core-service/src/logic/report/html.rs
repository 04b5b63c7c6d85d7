//! Hierarchical report: one collapsible section per model folder, overflowing
//! INSTs cells replaced by links into `details/`.
//!
//! Output is a pure function of the document so repeated renders are
//! byte-identical.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use super::document::{DetailPage, ReportDocument, ReportRow, COLUMNS};
use super::literal::render_entry;
use crate::logic::error::TraceResult;

/// Subdirectory holding detail pages
pub const DETAILS_DIR: &str = "details";

pub const INDEX_FILE: &str = "index.html";

const STYLE: &str = "body{font-family:monospace}table{border-collapse:collapse}\
td,th{border:1px solid #999;padding:2px 6px;vertical-align:top}summary{cursor:pointer;font-weight:bold}";

pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn page_head(out: &mut String, title: &str) {
    let _ = write!(
        out,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n",
        escape(title),
        STYLE
    );
}

/// Rows grouped by folder, folders in first-appearance order
fn group_by_folder(rows: &[ReportRow]) -> Vec<(&str, Vec<&ReportRow>)> {
    let mut groups: Vec<(&str, Vec<&ReportRow>)> = Vec::new();
    for row in rows {
        match groups.iter().position(|(folder, _)| *folder == row.folder) {
            Some(slot) => groups[slot].1.push(row),
            None => groups.push((row.folder.as_str(), vec![row])),
        }
    }
    groups
}

pub fn render_index(doc: &ReportDocument) -> String {
    let mut out = String::new();
    page_head(&mut out, "Kernel anomaly report");

    let groups = group_by_folder(&doc.rows);
    let _ = writeln!(
        out,
        "<h1>Kernel anomaly report</h1>\n<p>{} kernel records in {} folders, {} detail pages</p>",
        doc.rows.len(),
        groups.len(),
        doc.details.len()
    );

    if groups.is_empty() {
        out.push_str("<p>No anomalies recorded.</p>\n");
    }

    for (folder, rows) in groups {
        let _ = writeln!(
            out,
            "<details open>\n<summary>{} ({} kernels)</summary>\n<table>",
            escape(folder),
            rows.len()
        );
        out.push_str("<tr>");
        for column in COLUMNS {
            let _ = write!(out, "<th>{}</th>", column);
        }
        out.push_str("</tr>\n");

        for row in rows {
            let insts = match &row.detail {
                Some(file_name) => format!(
                    "<a href=\"{}/{}\">{} entries ({} chars)</a>",
                    DETAILS_DIR,
                    escape(file_name),
                    row.entry_count,
                    row.insts.chars().count()
                ),
                None => escape(&row.insts),
            };
            let _ = writeln!(
                out,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&row.folder),
                escape(&row.kernel),
                escape(&row.functions),
                insts
            );
        }
        out.push_str("</table>\n</details>\n");
    }

    out.push_str("</body>\n</html>\n");
    out
}

pub fn render_detail(page: &DetailPage) -> String {
    let mut out = String::new();
    page_head(&mut out, &format!("{} / {}", page.folder, page.kernel));

    let _ = writeln!(
        out,
        "<p><a href=\"../{}\">back to report</a></p>\n<h1>{}</h1>\n<h2>{}</h2>\n<p>{} entries</p>\n<ol>",
        INDEX_FILE,
        escape(&page.folder),
        escape(&page.kernel),
        page.entries.len()
    );
    for entry in &page.entries {
        let _ = writeln!(out, "<li><code>{}</code></li>", escape(&render_entry(entry)));
    }
    let _ = writeln!(out, "</ol>\n<h3>INSTs</h3>\n<pre>{}</pre>", escape(&page.insts));

    out.push_str("</body>\n</html>\n");
    out
}

/// Remove `.html` pages under `details_dir` that `keep` does not name, then
/// the directory itself once it is empty.
fn prune_details(details_dir: &Path, keep: &HashSet<&str>) -> TraceResult<usize> {
    if !details_dir.is_dir() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in fs::read_dir(details_dir)? {
        let path = entry?.path();
        let stale = path.extension().is_some_and(|ext| ext == "html")
            && path
                .file_name()
                .and_then(|name| name.to_str())
                .map_or(true, |name| !keep.contains(name));
        if stale && path.is_file() {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }

    if fs::read_dir(details_dir)?.next().is_none() {
        fs::remove_dir(details_dir)?;
    }
    Ok(removed)
}

/// Write `index.html` and every detail page under `out_dir`.
///
/// Pages left in `details/` by an earlier render are removed so every page
/// on disk is linked from exactly one row of the new index.
pub fn write_hierarchical(doc: &ReportDocument, out_dir: &Path) -> TraceResult<(PathBuf, Vec<PathBuf>)> {
    fs::create_dir_all(out_dir)?;

    let index_path = out_dir.join(INDEX_FILE);
    fs::write(&index_path, render_index(doc))?;

    let details_dir = out_dir.join(DETAILS_DIR);
    let mut detail_paths = Vec::with_capacity(doc.details.len());
    if !doc.details.is_empty() {
        fs::create_dir_all(&details_dir)?;
        for page in &doc.details {
            let path = details_dir.join(&page.file_name);
            fs::write(&path, render_detail(page))?;
            detail_paths.push(path);
        }
    }

    let keep: HashSet<&str> = doc.details.iter().map(|page| page.file_name.as_str()).collect();
    let removed = prune_details(&details_dir, &keep)?;
    if removed > 0 {
        log::debug!("Removed {} stale detail pages from {}", removed, details_dir.display());
    }

    log::info!("Wrote {} with {} detail pages", index_path.display(), detail_paths.len());
    Ok((index_path, detail_paths))
}
