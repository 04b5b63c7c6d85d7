//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.

/// Largest INSTs cell kept inline (spreadsheet cell limit)
pub const DEFAULT_OVERFLOW_CHARS: usize = 32_767;

/// Default report output directory
pub const DEFAULT_OUTPUT_DIR: &str = "nantrace_report";

/// Default native detector library preloaded into every model process
pub const DEFAULT_DETECTOR_LIB: &str = "/usr/local/lib/nixnan.so";

/// Default interpreter for model scripts
pub const DEFAULT_PYTHON: &str = "python3";

/// Default per-model timeout (seconds)
pub const DEFAULT_MODEL_TIMEOUT: u64 = 300;

/// Default corruption probability of the injection regime
pub const DEFAULT_CORRUPTION_PROBABILITY: f64 = 0.05;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "nantrace";

// ============================================
// Environment contract shared with child processes
// ============================================

pub const ENV_PRELOAD: &str = "LD_PRELOAD";
pub const ENV_CORRUPTION_PROBABILITY: &str = "NANTRACE_CORRUPTION_PROBABILITY";
pub const ENV_NAN_FRACTION: &str = "NANTRACE_NAN_FRACTION";
pub const ENV_ALTERNATE: &str = "NANTRACE_ALTERNATE";
pub const ENV_SEED: &str = "NANTRACE_SEED";

// ============================================
// Configuration overlay read by the CLI
// ============================================

pub const ENV_OVERFLOW: &str = "NANTRACE_OVERFLOW";
pub const ENV_OUTPUT_DIR: &str = "NANTRACE_OUTPUT_DIR";
pub const ENV_FORMAT: &str = "NANTRACE_FORMAT";
pub const ENV_DETECTOR_LIB: &str = "NANTRACE_DETECTOR_LIB";
pub const ENV_PYTHON: &str = "NANTRACE_PYTHON";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get process-level seed from environment
pub fn get_seed() -> Option<u64> {
    std::env::var(ENV_SEED)
        .ok()
        .and_then(|s| s.trim().parse().ok())
}

/// Default config file location
pub fn get_config_path() -> std::path::PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(APP_NAME)
        .join("config.json")
}
