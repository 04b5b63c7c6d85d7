//! Trace Module - raw detector log decoding
//!
//! - `types.rs` - AnomalyKind / AnomalyEvent (immutable once parsed)
//! - `parser.rs` - streaming AnomalyLogParser with per-session folder context

pub mod types;
pub mod parser;

#[cfg(test)]
mod tests;

pub use types::{AnomalyEvent, AnomalyKind, KindSet};
pub use parser::{
    classify_line,
    AnomalyLogParser,
    LineKind,
    ParseStats,
    DETECTOR_PREFIX,
    UNATTRIBUTED_FOLDER,
};
