//! Error types shared by the trace pipeline and the injection wrapper.

use thiserror::Error;

pub type TraceResult<T> = Result<T, TraceError>;

/// Invalid configuration. Always fatal at construction time.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} must be within [0, 1], got {value}")]
    OutOfRange { name: &'static str, value: f64 },

    #[error("overflow threshold must be greater than zero")]
    ZeroThreshold,

    #[error("invalid overflow threshold '{0}' (expected chars:<n> or entries:<n>)")]
    ThresholdSyntax(String),

    #[error("invalid value for {key}: '{value}'")]
    InvalidEnv { key: &'static str, value: String },

    #[error("unknown alternate corruption value '{0}'")]
    UnknownAlternate(String),

    #[error("unknown export format '{0}'")]
    UnknownFormat(String),

    #[error("config file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure to read back an INSTs literal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LiteralError {
    #[error("unexpected end of literal at offset {0}")]
    UnexpectedEnd(usize),

    #[error("expected '{expected}' at offset {offset}, found '{found}'")]
    Expected { expected: char, offset: usize, found: char },

    #[error("invalid operand number at offset {0}")]
    BadOperand(usize),

    #[error("unknown anomaly kind '{0}'")]
    UnknownKind(String),

    #[error("trailing characters after literal at offset {0}")]
    Trailing(usize),
}

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("INSTs literal error: {0}")]
    Literal(#[from] LiteralError),

    #[error("Launch error: {0}")]
    Launch(String),
}
