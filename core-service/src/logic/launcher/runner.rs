//! Suite Runner
//!
//! Executes each model of a suite in sequence under the preloaded detector.
//! Everything a child prints lands in the trace file, preceded by a
//! `folder=<name>` marker so the parser can attribute it.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::process::Command;

use super::suite::{ModelSpec, ModelSuite};
use crate::constants::{ENV_CORRUPTION_PROBABILITY, ENV_PRELOAD};
use crate::logic::error::{TraceError, TraceResult};
use crate::logic::inject::InjectionConfig;

/// Execution regime of a monitored run
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Regime {
    Normal,
    Injected(InjectionConfig),
}

impl Regime {
    pub fn label(&self) -> &'static str {
        match self {
            Regime::Normal => "normal",
            Regime::Injected(_) => "injected",
        }
    }

    pub fn injection(&self) -> Option<&InjectionConfig> {
        match self {
            Regime::Normal => None,
            Regime::Injected(config) => Some(config),
        }
    }

    /// Corruption is only exported through the environment; a child that
    /// never calls `InjectionConfig::from_env` runs uncorrupted.
    pub fn scope_warning(&self) -> Option<String> {
        self.injection().map(|_| {
            format!(
                "injected regime only exports {} and related variables; models that do not read them via InjectionConfig::from_env run uncorrupted",
                ENV_CORRUPTION_PROBABILITY
            )
        })
    }
}

#[derive(Debug, Clone)]
pub struct LaunchConfig {
    /// Native detector preloaded into every child
    pub detector_library: String,
    /// Interpreter used to run model scripts
    pub interpreter: String,
    /// Raw anomaly log written by this run
    pub trace_path: PathBuf,
    pub regime: Regime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Passed,
    Failed { code: Option<i32> },
    Timeout { after_secs: u64 },
    NotFound,
    Error { message: String },
}

impl RunStatus {
    pub fn is_passed(&self) -> bool {
        matches!(self, RunStatus::Passed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Passed => "PASSED",
            RunStatus::Failed { .. } => "FAILED",
            RunStatus::Timeout { .. } => "TIMEOUT",
            RunStatus::NotFound => "NOT_FOUND",
            RunStatus::Error { .. } => "ERROR",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelOutcome {
    pub name: String,
    pub folder: String,
    pub status: RunStatus,
    pub elapsed_secs: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuiteSummary {
    pub regime: &'static str,
    pub started_at: DateTime<Utc>,
    pub total_secs: f64,
    pub trace_path: PathBuf,
    pub outcomes: Vec<ModelOutcome>,
}

impl SuiteSummary {
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }

    /// Percentage, 0 for an empty suite
    pub fn pass_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            0.0
        } else {
            self.passed() as f64 / self.outcomes.len() as f64 * 100.0
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }
}

pub struct SuiteRunner {
    config: LaunchConfig,
}

impl SuiteRunner {
    pub fn new(config: LaunchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LaunchConfig {
        &self.config
    }

    /// Environment handed to every model process
    pub fn child_env(&self) -> Vec<(&'static str, String)> {
        let mut vars = vec![(ENV_PRELOAD, self.config.detector_library.clone())];
        if let Some(injection) = self.config.regime.injection() {
            vars.extend(injection.to_env());
        }
        vars
    }

    /// Run every model in order. Only failure to create or write the trace
    /// file is an error; model failures are reported in the summary.
    pub async fn run(&self, suite: &ModelSuite) -> TraceResult<SuiteSummary> {
        let started_at = Utc::now();
        let clock = Instant::now();

        if let Some(parent) = self.config.trace_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut trace = File::create(&self.config.trace_path)?;
        writeln!(
            trace,
            "# nantrace {} run started {} ({} models)",
            self.config.regime.label(),
            started_at.to_rfc3339(),
            suite.len()
        )?;

        if let Some(warning) = self.config.regime.scope_warning() {
            log::warn!("{}", warning);
        }
        log::info!(
            "Running {} models ({} regime), trace -> {}",
            suite.len(),
            self.config.regime.label(),
            self.config.trace_path.display()
        );

        let mut outcomes = Vec::with_capacity(suite.len());
        for spec in &suite.models {
            let outcome = self.run_model(spec, &mut trace).await?;
            log::info!("{} {} ({:.1}s)", outcome.name, outcome.status.as_str(), outcome.elapsed_secs);
            outcomes.push(outcome);
        }

        trace.flush()?;
        Ok(SuiteSummary {
            regime: self.config.regime.label(),
            started_at,
            total_secs: clock.elapsed().as_secs_f64(),
            trace_path: self.config.trace_path.clone(),
            outcomes,
        })
    }

    async fn run_model(&self, spec: &ModelSpec, trace: &mut File) -> TraceResult<ModelOutcome> {
        let folder = spec.folder();
        let clock = Instant::now();

        writeln!(trace, "folder={}", folder)?;
        trace.flush()?;

        let status = if !spec.script.exists() {
            log::warn!("{} script not found: {}", spec.name, spec.script.display());
            RunStatus::NotFound
        } else {
            self.spawn_and_wait(spec, trace).await?
        };

        writeln!(trace, "# finished {}: {}", spec.name, status.as_str())?;
        trace.flush()?;

        Ok(ModelOutcome {
            name: spec.name.clone(),
            folder,
            status,
            elapsed_secs: clock.elapsed().as_secs_f64(),
        })
    }

    async fn spawn_and_wait(&self, spec: &ModelSpec, trace: &File) -> TraceResult<RunStatus> {
        let (workdir, script) = split_script(&spec.script);

        let mut command = Command::new(&self.config.interpreter);
        command
            .arg(script)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(trace.try_clone()?))
            .stderr(Stdio::from(trace.try_clone()?))
            .kill_on_drop(true);
        for (key, value) in self.child_env() {
            command.env(key, value);
        }

        log::debug!("Launching {} with {} {}", spec.name, self.config.interpreter, spec.script.display());
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                log::error!("Failed to launch {}: {}", spec.name, e);
                return Ok(RunStatus::Error { message: e.to_string() });
            }
        };

        let limit = Duration::from_secs(spec.timeout_secs);
        match tokio::time::timeout(limit, child.wait()).await {
            Ok(Ok(exit)) if exit.success() => Ok(RunStatus::Passed),
            Ok(Ok(exit)) => Ok(RunStatus::Failed { code: exit.code() }),
            Ok(Err(e)) => Ok(RunStatus::Error { message: e.to_string() }),
            Err(_) => {
                log::warn!("{} exceeded {}s, killing", spec.name, spec.timeout_secs);
                child
                    .kill()
                    .await
                    .map_err(|e| TraceError::Launch(format!("failed to kill {}: {}", spec.name, e)))?;
                Ok(RunStatus::Timeout { after_secs: spec.timeout_secs })
            }
        }
    }
}

/// (working directory, script argument) for running `script` from its folder
fn split_script(script: &Path) -> (PathBuf, PathBuf) {
    match (script.parent(), script.file_name()) {
        (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => {
            (parent.to_path_buf(), PathBuf::from(name))
        }
        _ => (PathBuf::from("."), script.to_path_buf()),
    }
}
