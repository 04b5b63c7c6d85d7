use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of a numerical issue reported by the detector.
///
/// Declaration order is the rendering order inside a [`KindSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyKind {
    Subnormal,
    Inf,
    Nan,
    Div0,
}

/// Anomaly kinds attached to one instruction hit.
pub type KindSet = BTreeSet<AnomalyKind>;

impl AnomalyKind {
    pub const ALL: [AnomalyKind; 4] = [
        AnomalyKind::Subnormal,
        AnomalyKind::Inf,
        AnomalyKind::Nan,
        AnomalyKind::Div0,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyKind::Subnormal => "subnormal",
            AnomalyKind::Inf => "inf",
            AnomalyKind::Nan => "nan",
            AnomalyKind::Div0 => "div0",
        }
    }

    /// Decode a detector token. Case-insensitive, accepts the common aliases.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "subnormal" | "sub" | "denormal" => Some(AnomalyKind::Subnormal),
            "inf" | "infinity" | "+inf" | "-inf" => Some(AnomalyKind::Inf),
            "nan" => Some(AnomalyKind::Nan),
            "div0" | "div_by_zero" | "divzero" => Some(AnomalyKind::Div0),
            _ => None,
        }
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One raw detection occurrence, as decoded from a single log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyEvent {
    /// Model folder active when the line was emitted
    pub folder: String,
    pub kernel: String,
    /// Functions active when the event fired
    pub functions: BTreeSet<String>,
    /// Never empty
    pub kinds: KindSet,
    pub operand: u32,
    pub instruction: String,
}

impl AnomalyEvent {
    pub fn new(
        folder: impl Into<String>,
        kernel: impl Into<String>,
        functions: impl IntoIterator<Item = impl Into<String>>,
        kinds: impl IntoIterator<Item = AnomalyKind>,
        operand: u32,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            folder: folder.into(),
            kernel: kernel.into(),
            functions: functions.into_iter().map(Into::into).collect(),
            kinds: kinds.into_iter().collect(),
            operand,
            instruction: instruction.into(),
        }
    }
}
