//! Logic Module - trace pipeline, injection & monitored runs
//!
//! ## Architecture
//! - `trace/` - raw anomaly log decoding (AnomalyLogParser)
//! - `aggregate/` - per-kernel records (RunAggregator), regime comparison
//! - `report/` - tabular + hierarchical rendering (ReportRenderer)
//! - `inject/` - stochastic corruption of model inputs (InjectionWrapper)
//! - `launcher/` - model suite execution under the preloaded detector
//! - `pipeline.rs` - log file -> report files glue
//! - `config.rs` - layered PipelineConfig

pub mod error;
pub mod config;

// Trace pipeline
pub mod trace;
pub mod aggregate;
pub mod report;
pub mod pipeline;

// Producers of raw logs
pub mod inject;
pub mod launcher;
