//! Run Aggregator
//!
//! Folds the event stream into one record per (folder, kernel).

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::logic::trace::{AnomalyEvent, AnomalyKind, KindSet};

/// One instruction hit inside a record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstEntry {
    pub kinds: KindSet,
    pub operand: u32,
    pub instruction: String,
}

/// Aggregation key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub folder: String,
    pub kernel: String,
}

impl RecordKey {
    pub fn new(folder: impl Into<String>, kernel: impl Into<String>) -> Self {
        Self { folder: folder.into(), kernel: kernel.into() }
    }
}

/// Summary of every event observed for one (folder, kernel) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelAnomalyRecord {
    pub folder: String,
    pub kernel: String,
    /// Union of functions across events
    pub functions: BTreeSet<String>,
    /// Concatenation of entries in first-seen order
    pub entries: Vec<InstEntry>,
}

impl KernelAnomalyRecord {
    fn from_event(event: AnomalyEvent) -> Self {
        let AnomalyEvent { folder, kernel, functions, kinds, operand, instruction } = event;
        Self {
            folder,
            kernel,
            functions,
            entries: vec![InstEntry { kinds, operand, instruction }],
        }
    }

    fn absorb(&mut self, event: AnomalyEvent) {
        self.functions.extend(event.functions);
        self.entries.push(InstEntry {
            kinds: event.kinds,
            operand: event.operand,
            instruction: event.instruction,
        });
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.folder.clone(), self.kernel.clone())
    }
}

/// Per-kind occurrence counts over a record set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindTally {
    pub subnormal: u64,
    pub inf: u64,
    pub nan: u64,
    pub div0: u64,
}

impl KindTally {
    pub fn from_records(records: &[KernelAnomalyRecord]) -> Self {
        let mut tally = Self::default();
        for kind in records.iter().flat_map(|r| r.entries.iter()).flat_map(|e| e.kinds.iter()) {
            match kind {
                AnomalyKind::Subnormal => tally.subnormal += 1,
                AnomalyKind::Inf => tally.inf += 1,
                AnomalyKind::Nan => tally.nan += 1,
                AnomalyKind::Div0 => tally.div0 += 1,
            }
        }
        tally
    }

    pub fn total(&self) -> u64 {
        self.subnormal + self.inf + self.nan + self.div0
    }
}

/// Sequential fold over [`AnomalyEvent`]s.
///
/// Records live in a vector in first-seen order; the map only indexes them,
/// so nothing depends on hash iteration order.
#[derive(Debug, Default)]
pub struct RunAggregator {
    index: HashMap<RecordKey, usize>,
    records: Vec<KernelAnomalyRecord>,
    events_folded: u64,
}

impl RunAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fold(&mut self, event: AnomalyEvent) {
        self.events_folded += 1;
        let key = RecordKey::new(event.folder.as_str(), event.kernel.as_str());

        match self.index.get(&key) {
            Some(&slot) => self.records[slot].absorb(event),
            None => {
                self.index.insert(key, self.records.len());
                self.records.push(KernelAnomalyRecord::from_event(event));
            }
        }
    }

    pub fn events_folded(&self) -> u64 {
        self.events_folded
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Records ordered by folder, then kernel; ties keep first-seen order.
    pub fn finish(self) -> Vec<KernelAnomalyRecord> {
        let mut records = self.records;
        records.sort_by(|a, b| a.folder.cmp(&b.folder).then_with(|| a.kernel.cmp(&b.kernel)));
        log::debug!("Aggregated {} events into {} kernel records", self.events_folded, records.len());
        records
    }
}

impl Extend<AnomalyEvent> for RunAggregator {
    fn extend<T: IntoIterator<Item = AnomalyEvent>>(&mut self, events: T) {
        for event in events {
            self.fold(event);
        }
    }
}

/// Fold a complete event sequence into sorted records.
pub fn aggregate<I>(events: I) -> Vec<KernelAnomalyRecord>
where
    I: IntoIterator<Item = AnomalyEvent>,
{
    let mut aggregator = RunAggregator::new();
    aggregator.extend(events);
    aggregator.finish()
}
