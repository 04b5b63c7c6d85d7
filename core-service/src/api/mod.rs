//! API Module
//!
//! Command handlers behind the `nantrace` binary. Each handler returns a
//! serializable outcome; printing is left to `print_*` helpers so `--json`
//! can reuse the same data.

pub mod commands;

pub use commands::*;
