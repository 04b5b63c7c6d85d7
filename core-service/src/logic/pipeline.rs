//! Trace pipeline: raw log -> parser -> aggregator -> report files.
//!
//! Single pass over the log. The log is opened once and read as a stream;
//! malformed lines are counted in [`ParseStats`], never fatal.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Serialize;

use crate::logic::aggregate::{KernelAnomalyRecord, KindTally, RegimeComparison, RunAggregator};
use crate::logic::error::TraceResult;
use crate::logic::report::{write_report, ExportFormat, OverflowThreshold, ReportArtifacts, ReportDocument};
use crate::logic::trace::{AnomalyLogParser, ParseStats};

/// Aggregated view of one raw log
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub stats: ParseStats,
    pub records: Vec<KernelAnomalyRecord>,
    pub tally: KindTally,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub summary: RunSummary,
    pub artifacts: ReportArtifacts,
    /// Rows whose INSTs moved to a detail page
    pub overflowed: usize,
}

/// Parse and aggregate the log at `log`.
pub fn summarize_log(log: &Path) -> TraceResult<RunSummary> {
    let file = File::open(log)?;
    let mut parser = AnomalyLogParser::new(BufReader::new(file));
    let mut aggregator = RunAggregator::new();

    aggregator.extend(parser.by_ref());

    let stats = parser.into_stats();
    let records = aggregator.finish();
    let tally = KindTally::from_records(&records);

    log::info!(
        "{}: {} lines, {} events, {} records ({} malformed)",
        log.display(),
        stats.lines_read,
        stats.events,
        records.len(),
        stats.malformed_lines
    );

    Ok(RunSummary { stats, records, tally })
}

/// Full pipeline: summarize `log` and render both report forms into `out_dir`.
pub fn render_log(
    log: &Path,
    out_dir: &Path,
    threshold: OverflowThreshold,
    format: ExportFormat,
) -> TraceResult<PipelineOutcome> {
    let summary = summarize_log(log)?;

    let doc = ReportDocument::build(&summary.records, threshold);
    let artifacts = write_report(&doc, out_dir, format)?;
    let overflowed = doc.details.len();

    if overflowed > 0 {
        log::info!("{} kernels exceed {}, moved to detail pages", overflowed, threshold);
    }
    log::info!("Report written to {}", out_dir.display());

    Ok(PipelineOutcome { summary, artifacts, overflowed })
}

/// Key-level comparison of a normal-run log against a corrupted-run log.
pub fn compare_logs(baseline: &Path, injected: &Path) -> TraceResult<RegimeComparison> {
    let baseline = summarize_log(baseline)?;
    let injected = summarize_log(injected)?;
    Ok(RegimeComparison::between(&baseline.records, &injected.records))
}
