//! Aggregate Module - per-kernel summary records
//!
//! - `aggregator.rs` - RunAggregator fold, KernelAnomalyRecord, KindTally
//! - `compare.rs` - key-level diff between a normal and a corrupted run

pub mod aggregator;
pub mod compare;


pub use aggregator::{aggregate, InstEntry, KernelAnomalyRecord, KindTally, RecordKey, RunAggregator};
pub use compare::RegimeComparison;
