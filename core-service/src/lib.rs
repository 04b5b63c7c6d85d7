//! nantrace core library
//!
//! Tracks floating-point anomalies (NaN, Inf, subnormal, division by zero)
//! reported by a GPU detector while neural-network models run, and turns the
//! raw detector log into per-kernel reports.

pub mod constants;
pub mod logic;
