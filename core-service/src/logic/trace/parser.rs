//! Anomaly Log Parser
//!
//! Turns the raw, newline-delimited detector output into [`AnomalyEvent`]s.
//! This is the only place in the crate that knows the raw log framing:
//!
//! ```text
//! folder=autoencoder
//! Script: /work/models/simple_gan/simple_gan.py
//! #nixnan: error [nan, inf] detected in operand 0 of instruction FADD R1, R2, R3 in function [fn1; fn2] of kernel kernelA
//! ```
//!
//! Context lines switch the active model folder for the rest of the session.
//! A `folder=` marker only counts when its value is a single token without
//! path separators, so a model printing `folder=/tmp/ckpt` is left alone.
//! Any other line is ordinary program output and is ignored.

use std::borrow::Cow;
use std::io::BufRead;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::types::{AnomalyEvent, AnomalyKind, KindSet};

/// Prefix shared by every detector line
pub const DETECTOR_PREFIX: &str = "#nixnan:";

/// Folder used for events seen before any context marker
pub const UNATTRIBUTED_FOLDER: &str = "(unattributed)";

/// Number of malformed lines reported at `warn` before dropping to `debug`
const MALFORMED_WARN_LIMIT: u64 = 5;

static EVENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^#nixnan:\s*error\s*\[(?P<kinds>[^\]]*)\]\s+detected in operand\s+(?P<operand>\S+)\s+of instruction\s+(?P<inst>.+?)\s+in functions?\s+\[(?P<functions>.*)\]\s+of kernel\s+(?P<kernel>.*?)\s*$",
    )
    .expect("event pattern is valid")
});

/// Marker written by the suite runner: one token, no path separators
static FOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^folder=(?P<folder>[^\s/\\]+)\s*$").expect("folder pattern is valid"));

static SCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*Script:\s*(?P<path>\S.*?)\s*$").expect("script pattern is valid"));

/// Diagnostics for one parse session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParseStats {
    pub lines_read: u64,
    pub events: u64,
    pub context_markers: u64,
    pub malformed_lines: u64,
    pub other_lines: u64,
    pub read_errors: u64,
}

/// Classification of a single raw line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// Switches the active folder
    Context(String),
    /// Decoded detector event (folder left empty, filled in by the session)
    Event(AnomalyEvent),
    /// Detector event line that could not be decoded
    Malformed(&'static str),
    /// Anything else
    Other,
}

/// Classify one line without any session state.
pub fn classify_line(line: &str) -> LineKind {
    let trimmed = line.trim_end_matches(['\r', '\n']);

    if let Some(caps) = FOLDER_RE.captures(trimmed) {
        return LineKind::Context(caps["folder"].to_string());
    }

    if let Some(caps) = SCRIPT_RE.captures(trimmed) {
        return match script_folder(&caps["path"]) {
            Some(folder) => LineKind::Context(folder),
            None => LineKind::Other,
        };
    }

    let body = trimmed.trim_start();
    if !body.starts_with(DETECTOR_PREFIX) {
        return LineKind::Other;
    }
    // Informational detector output (banners, counters) is not an event
    if !body[DETECTOR_PREFIX.len()..].trim_start().starts_with("error") {
        return LineKind::Other;
    }

    match decode_event(body) {
        Ok(event) => LineKind::Event(event),
        Err(reason) => LineKind::Malformed(reason),
    }
}

fn script_folder(path: &str) -> Option<String> {
    Path::new(path)
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

fn decode_event(line: &str) -> Result<AnomalyEvent, &'static str> {
    let caps = EVENT_RE.captures(line).ok_or("line does not match event grammar")?;

    let mut kinds = KindSet::new();
    for token in caps["kinds"]
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
    {
        let kind = AnomalyKind::from_token(token).ok_or("unknown anomaly kind")?;
        kinds.insert(kind);
    }
    if kinds.is_empty() {
        return Err("empty anomaly kind list");
    }

    let operand: u32 = caps["operand"].parse().map_err(|_| "invalid operand index")?;

    let kernel = caps["kernel"].trim();
    if kernel.is_empty() {
        return Err("missing kernel name");
    }

    let functions = caps["functions"]
        .split(';')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect();

    Ok(AnomalyEvent {
        folder: String::new(),
        kernel: kernel.to_string(),
        functions,
        kinds,
        operand,
        instruction: caps["inst"].trim().to_string(),
    })
}

/// Streaming parser over a raw anomaly log.
///
/// Owns its reader, so the sequence can only be walked once. Stream end,
/// including a truncated final line, terminates the sequence normally.
pub struct AnomalyLogParser<R> {
    reader: R,
    buf: Vec<u8>,
    current_folder: Option<String>,
    stats: ParseStats,
    finished: bool,
}

impl<R: BufRead> AnomalyLogParser<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(256),
            current_folder: None,
            stats: ParseStats::default(),
            finished: false,
        }
    }

    pub fn stats(&self) -> ParseStats {
        self.stats
    }

    /// Folder context currently in effect
    pub fn current_folder(&self) -> Option<&str> {
        self.current_folder.as_deref()
    }

    /// Drain the remaining events, returning the final diagnostics.
    pub fn into_stats(mut self) -> ParseStats {
        while self.next().is_some() {}
        self.stats
    }

    fn note_malformed(&mut self, reason: &'static str) {
        self.stats.malformed_lines += 1;
        if self.stats.malformed_lines <= MALFORMED_WARN_LIMIT {
            log::warn!("Skipping malformed detector line {}: {}", self.stats.lines_read, reason);
        } else {
            log::debug!("Skipping malformed detector line {}: {}", self.stats.lines_read, reason);
        }
    }
}

impl<R: BufRead> Iterator for AnomalyLogParser<R> {
    type Item = AnomalyEvent;

    fn next(&mut self) -> Option<AnomalyEvent> {
        while !self.finished {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.finished = true;
                }
                Ok(_) => {
                    self.stats.lines_read += 1;
                    // Invalid bytes become U+FFFD; the line is still classified
                    let kind = match String::from_utf8_lossy(&self.buf) {
                        Cow::Borrowed(line) => classify_line(line),
                        Cow::Owned(line) => {
                            log::debug!("Line {} is not valid UTF-8, decoded lossily", self.stats.lines_read);
                            classify_line(&line)
                        }
                    };

                    match kind {
                        LineKind::Context(folder) => {
                            log::debug!("Entering model folder '{}'", folder);
                            self.stats.context_markers += 1;
                            self.current_folder = Some(folder);
                        }
                        LineKind::Event(mut event) => {
                            event.folder = self
                                .current_folder
                                .clone()
                                .unwrap_or_else(|| UNATTRIBUTED_FOLDER.to_string());
                            self.stats.events += 1;
                            return Some(event);
                        }
                        LineKind::Malformed(reason) => self.note_malformed(reason),
                        LineKind::Other => self.stats.other_lines += 1,
                    }
                }
                Err(e) => {
                    log::warn!("Anomaly log read failed after {} lines, treating as end of trace: {}",
                        self.stats.lines_read, e);
                    self.stats.read_errors += 1;
                    self.finished = true;
                }
            }
        }
        None
    }
}
