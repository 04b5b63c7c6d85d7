//! CLI Commands - report, run, compare, inject
//!
//! Handlers take the fully layered [`PipelineConfig`] and return plain data.

use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::Serialize;

use nantrace_core::logic::aggregate::{KindTally, RegimeComparison};
use nantrace_core::logic::config::PipelineConfig;
use nantrace_core::logic::error::TraceResult;
use nantrace_core::logic::inject::{inject, Forward, InjectionConfig, InjectionStats};
use nantrace_core::logic::launcher::{LaunchConfig, Regime, SuiteRunner, SuiteSummary};
use nantrace_core::logic::pipeline::{self, PipelineOutcome};

// ============================================================================
// REPORT
// ============================================================================

/// Render the reports for an existing raw log
pub fn report(config: &PipelineConfig, log: &Path) -> TraceResult<PipelineOutcome> {
    report_into(config, log, &config.output_dir)
}

fn report_into(config: &PipelineConfig, log: &Path, out_dir: &Path) -> TraceResult<PipelineOutcome> {
    pipeline::render_log(log, out_dir, config.overflow, config.format)
}

pub fn print_report(outcome: &PipelineOutcome) {
    let stats = &outcome.summary.stats;
    println!("📄 {} lines read, {} anomaly events", stats.lines_read, stats.events);
    if stats.malformed_lines > 0 {
        println!("   ⚠ {} malformed detector lines skipped", stats.malformed_lines);
    }
    println!("   {} kernel records", outcome.summary.records.len());
    print_tally("   ", &outcome.summary.tally);
    println!("   Table: {}", outcome.artifacts.tabular.display());
    println!("   Index: {}", outcome.artifacts.index.display());
    if outcome.overflowed > 0 {
        println!("   {} kernels moved to detail pages", outcome.overflowed);
    }
}

// ============================================================================
// RUN
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub summary: SuiteSummary,
    pub report: Option<PipelineOutcome>,
}

/// Where a run writes its raw log when no path is given
pub fn default_trace_path(config: &PipelineConfig, regime: &Regime) -> PathBuf {
    config.output_dir.join(format!("trace_output_{}.txt", regime.label()))
}

/// Report directory of one regime, so normal and injected runs sit side by side
pub fn report_dir(config: &PipelineConfig, regime: &Regime) -> PathBuf {
    config.output_dir.join(regime.label())
}

/// Run the model suite under the detector, optionally rendering the log into
/// [`report_dir`] afterwards
pub async fn run_suite(
    config: &PipelineConfig,
    regime: Regime,
    trace_path: PathBuf,
    render: bool,
) -> TraceResult<RunOutcome> {
    let suite = config.model_suite()?;
    let out_dir = report_dir(config, &regime);
    let runner = SuiteRunner::new(LaunchConfig {
        detector_library: config.detector_library.clone(),
        interpreter: config.interpreter.clone(),
        trace_path,
        regime,
    });

    let summary = runner.run(&suite).await?;
    let report = if render {
        Some(report_into(config, &summary.trace_path, &out_dir)?)
    } else {
        None
    };

    Ok(RunOutcome { summary, report })
}

pub fn print_run(outcome: &RunOutcome) {
    let summary = &outcome.summary;
    println!("🚀 {} run, trace: {}", summary.regime, summary.trace_path.display());
    for model in &summary.outcomes {
        let mark = if model.status.is_passed() { "✅" } else { "❌" };
        println!("   {} {:<24} {:<10} {:>7.1}s", mark, model.name, model.status.as_str(), model.elapsed_secs);
    }
    println!(
        "   {}/{} passed ({:.1}%) in {:.1}s",
        summary.passed(),
        summary.outcomes.len(),
        summary.pass_rate(),
        summary.total_secs
    );

    if let Some(report) = &outcome.report {
        print_report(report);
    }
}

// ============================================================================
// COMPARE
// ============================================================================

pub fn compare(baseline: &Path, injected: &Path) -> TraceResult<RegimeComparison> {
    pipeline::compare_logs(baseline, injected)
}

pub fn print_comparison(comparison: &RegimeComparison) {
    println!(
        "🔍 baseline: {} records, injected: {} records, shared: {}",
        comparison.baseline_records, comparison.injected_records, comparison.shared
    );
    print_tally("   baseline ", &comparison.baseline_tally);
    print_tally("   injected ", &comparison.injected_tally);

    if comparison.is_identical_keyset() {
        println!("   Same (folder, kernel) keys in both runs");
        return;
    }
    for key in &comparison.only_baseline {
        println!("   - {} / {}", key.folder, key.kernel);
    }
    for key in &comparison.only_injected {
        println!("   + {} / {}", key.folder, key.kernel);
    }
}

// ============================================================================
// INJECTION CHECK
// ============================================================================

/// Result of corrupting a synthetic tensor
#[derive(Debug, Clone, Serialize)]
pub struct InjectionCheck {
    pub config: InjectionConfig,
    pub shape: (usize, usize),
    pub passes: u32,
    pub stats: InjectionStats,
    /// Counts in the output of the last pass
    pub nan: usize,
    pub infinite: usize,
    pub untouched: usize,
}

/// Push `passes` synthetic tensors through an identity model wrapped with `config`.
pub fn check_injection(config: InjectionConfig, rows: usize, cols: usize, passes: u32) -> InjectionCheck {
    let model = inject(config, |x: Array2<f32>| x);
    let synthetic = Array2::from_shape_fn((rows, cols), |(r, c)| ((r * cols + c) as f32 * 0.01).sin() + 2.0);

    let mut last = synthetic.clone();
    for _ in 0..passes {
        last = model.forward(synthetic.clone());
    }

    let untouched = last
        .iter()
        .zip(synthetic.iter())
        .filter(|(out, input)| out.to_bits() == input.to_bits())
        .count();

    InjectionCheck {
        config,
        shape: (rows, cols),
        passes,
        stats: model.stats(),
        nan: last.iter().filter(|v| v.is_nan()).count(),
        infinite: last.iter().filter(|v| v.is_infinite()).count(),
        untouched,
    }
}

pub fn print_injection_check(check: &InjectionCheck) {
    let stats = &check.stats;
    println!(
        "🧪 p={} nan_fraction={} alternate={} over {} passes of {}x{}",
        check.config.corruption_probability(),
        check.config.nan_fraction(),
        check.config.alternate(),
        check.passes,
        check.shape.0,
        check.shape.1
    );
    println!(
        "   {} of {} elements corrupted ({} NaN, {} alternate)",
        stats.elements_corrupted, stats.elements_seen, stats.nan_written, stats.alternate_written
    );
    println!("   Last pass: {} NaN, {} Inf, {} untouched", check.nan, check.infinite, check.untouched);
}

fn print_tally(prefix: &str, tally: &KindTally) {
    println!(
        "{}nan={} inf={} subnormal={} div0={}",
        prefix, tally.nan, tally.inf, tally.subnormal, tally.div0
    );
}
