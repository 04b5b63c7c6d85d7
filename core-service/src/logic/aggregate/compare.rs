//! Regime comparison: normal run vs corrupted run.

use std::collections::BTreeSet;

use serde::Serialize;

use super::aggregator::{KernelAnomalyRecord, KindTally, RecordKey};

/// Key-level difference between two aggregated runs
#[derive(Debug, Clone, Serialize)]
pub struct RegimeComparison {
    pub baseline_records: usize,
    pub injected_records: usize,
    pub shared: usize,
    /// Keys present only in the baseline run, sorted
    pub only_baseline: Vec<RecordKey>,
    /// Keys present only in the injected run, sorted
    pub only_injected: Vec<RecordKey>,
    pub baseline_tally: KindTally,
    pub injected_tally: KindTally,
}

impl RegimeComparison {
    pub fn between(baseline: &[KernelAnomalyRecord], injected: &[KernelAnomalyRecord]) -> Self {
        let left: BTreeSet<RecordKey> = baseline.iter().map(KernelAnomalyRecord::key).collect();
        let right: BTreeSet<RecordKey> = injected.iter().map(KernelAnomalyRecord::key).collect();

        Self {
            baseline_records: baseline.len(),
            injected_records: injected.len(),
            shared: left.intersection(&right).count(),
            only_baseline: left.difference(&right).cloned().collect(),
            only_injected: right.difference(&left).cloned().collect(),
            baseline_tally: KindTally::from_records(baseline),
            injected_tally: KindTally::from_records(injected),
        }
    }

    pub fn is_identical_keyset(&self) -> bool {
        self.only_baseline.is_empty() && self.only_injected.is_empty()
    }
}
