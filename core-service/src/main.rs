//! nantrace CLI - GPU numerical anomaly tracing
//!
//! # Commands
//!
//! - `report` - Render reports from an existing raw anomaly log
//! - `run` - Run the model suite under the detector (normal or injected)
//! - `compare` - Key-level diff of a normal log against an injected log
//! - `inject` - Corrupt a synthetic tensor to check an injection config

mod api;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use nantrace_core::constants::{self, APP_NAME, APP_VERSION};
use nantrace_core::logic::config::PipelineConfig;
use nantrace_core::logic::inject::{AlternateValue, InjectionConfig};
use nantrace_core::logic::launcher::Regime;
use nantrace_core::logic::report::{ExportFormat, OverflowThreshold};

/// nantrace - floating-point anomaly reports for GPU model runs
#[derive(Parser)]
#[command(name = "nantrace")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render tabular and hierarchical reports from a raw log
    ///
    /// Examples:
    ///   nantrace report trace_output.txt
    ///   nantrace report trace_output.txt --overflow entries:500 --format jsonl
    Report {
        /// Raw anomaly log
        #[arg(value_name = "LOG")]
        log: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Run the model suite with the detector preloaded
    ///
    /// Reports go to <out>/normal or <out>/injected.
    ///
    /// Examples:
    ///   nantrace run --models-dir ./pytorch_GPU
    ///   nantrace run --inject --probability 0.05 --seed 7
    Run {
        /// Suite definition (JSON); default six-model suite when omitted
        #[arg(long)]
        suite: Option<PathBuf>,

        /// Base directory of the default suite
        #[arg(long)]
        models_dir: Option<PathBuf>,

        /// Raw log destination
        #[arg(long)]
        trace: Option<PathBuf>,

        /// Skip report rendering after the run
        #[arg(long)]
        no_report: bool,

        #[command(flatten)]
        injection: InjectionArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Compare a normal-run log against an injected-run log
    Compare {
        #[arg(value_name = "BASELINE")]
        baseline: PathBuf,

        #[arg(value_name = "INJECTED")]
        injected: PathBuf,
    },
    /// Corrupt a synthetic tensor and print the counters
    Inject {
        /// Tensor shape as ROWSxCOLS
        #[arg(long, default_value = "64x64", value_parser = parse_shape)]
        shape: (usize, usize),

        /// Number of forward passes
        #[arg(long, default_value = "1")]
        passes: u32,

        #[command(flatten)]
        injection: InjectionArgs,
    },
}

#[derive(Args)]
struct OutputArgs {
    /// Report directory
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Detail page threshold: chars:<n> or entries:<n>
    #[arg(long)]
    overflow: Option<OverflowThreshold>,

    /// Tabular format: csv, jsonl, json
    #[arg(short, long)]
    format: Option<ExportFormat>,
}

impl OutputArgs {
    fn apply(self, config: &mut PipelineConfig) {
        if let Some(out) = self.out {
            config.output_dir = out;
        }
        if let Some(overflow) = self.overflow {
            config.overflow = overflow;
        }
        if let Some(format) = self.format {
            config.format = format;
        }
    }
}

#[derive(Args)]
struct InjectionArgs {
    /// Enable the corrupted regime (always on for `inject`)
    ///
    /// For `run`, the settings reach each model only as NANTRACE_* variables;
    /// scripts that never call InjectionConfig::from_env run uncorrupted.
    #[arg(long)]
    inject: bool,

    /// Per-element corruption probability in [0, 1]
    #[arg(short, long)]
    probability: Option<f64>,

    /// Share of corrupted elements set to NaN, in [0, 1]
    #[arg(long)]
    nan_fraction: Option<f64>,

    /// Value written when not NaN: posinf, neginf, mixed, extreme
    #[arg(long)]
    alternate: Option<AlternateValue>,

    #[arg(long)]
    seed: Option<u64>,
}

impl InjectionArgs {
    /// Layer the flags over the configured injection settings
    fn resolve(&self, config: &PipelineConfig) -> anyhow::Result<InjectionConfig> {
        let base = config.injection_or_default()?;

        let mut resolved = InjectionConfig::new(
            self.probability.unwrap_or(base.corruption_probability()),
            self.nan_fraction.unwrap_or(base.nan_fraction()),
        )?
        .with_alternate(self.alternate.unwrap_or(base.alternate()));

        if let Some(seed) = self.seed.or(base.seed()) {
            resolved = resolved.with_seed(seed);
        }
        Ok(resolved)
    }

    fn requested(&self) -> bool {
        self.inject || self.probability.is_some() || self.nan_fraction.is_some()
    }
}

fn parse_shape(raw: &str) -> Result<(usize, usize), String> {
    let (rows, cols) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected ROWSxCOLS, got '{}'", raw))?;
    let rows = rows.trim().parse().map_err(|_| format!("invalid row count '{}'", rows))?;
    let cols = cols.trim().parse().map_err(|_| format!("invalid column count '{}'", cols))?;
    Ok((rows, cols))
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => PipelineConfig::load(&path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PipelineConfig::load_or_default(&constants::get_config_path())?,
    };
    config.apply_env().context("invalid NANTRACE_* environment")?;
    Ok(config)
}

fn emit<T: Serialize>(json: bool, value: &T, print: impl FnOnce(&T)) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print(value);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    log::info!("Starting {} v{}", APP_NAME, APP_VERSION);

    let mut config = load_config(cli.config)?;

    match cli.command {
        Commands::Report { log, output } => {
            output.apply(&mut config);
            let outcome = api::report(&config, &log)
                .with_context(|| format!("failed to render {}", log.display()))?;
            emit(cli.json, &outcome, api::print_report)?;
        }
        Commands::Run { suite, models_dir, trace, no_report, injection, output } => {
            output.apply(&mut config);
            if suite.is_some() {
                config.suite = suite;
            }
            if let Some(dir) = models_dir {
                config.models_dir = dir;
            }

            let regime = if injection.requested() {
                Regime::Injected(injection.resolve(&config)?)
            } else {
                Regime::Normal
            };
            let trace = trace.unwrap_or_else(|| api::default_trace_path(&config, &regime));

            let outcome = api::run_suite(&config, regime, trace, !no_report).await?;
            emit(cli.json, &outcome, api::print_run)?;

            if !outcome.summary.all_passed() {
                log::warn!("{} of {} models did not pass", outcome.summary.failed(), outcome.summary.outcomes.len());
            }
        }
        Commands::Compare { baseline, injected } => {
            let comparison = api::compare(&baseline, &injected)?;
            emit(cli.json, &comparison, api::print_comparison)?;
        }
        Commands::Inject { shape, passes, injection } => {
            let injection = injection.resolve(&config)?;
            let check = api::check_injection(injection, shape.0, shape.1, passes);
            emit(cli.json, &check, api::print_injection_check)?;
        }
    }

    Ok(())
}
