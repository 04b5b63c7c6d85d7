//! Launcher Module - monitored model runs
//!
//! Thin collaborator around process launching; the trace pipeline never
//! depends on it.
//!
//! ## Environment contract (set on every model process)
//! - `LD_PRELOAD` - path of the native anomaly detector
//! - `NANTRACE_CORRUPTION_PROBABILITY`, `NANTRACE_NAN_FRACTION`,
//!   `NANTRACE_ALTERNATE`, `NANTRACE_SEED` - injected regime only, read back
//!   by `InjectionConfig::from_env`
//!
//! stdout and stderr of every child are appended to the trace file; a
//! `folder=<model folder>` line precedes each model.

pub mod suite;
pub mod runner;


pub use suite::{ModelSpec, ModelSuite};
pub use runner::{LaunchConfig, ModelOutcome, Regime, RunStatus, SuiteRunner, SuiteSummary};
