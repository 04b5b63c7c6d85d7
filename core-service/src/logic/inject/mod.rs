//! Inject Module - stochastic corruption of forward-pass inputs
//!
//! ## Structure
//! - `config.rs` - InjectionConfig (validated, immutable) + env contract
//! - `injector.rs` - seeded element corruption, Corruptible inputs
//! - `wrapper.rs` - Forward trait and the Injected proxy
//!
//! ## Usage
//! ```ignore
//! let config = InjectionConfig::new(0.05, 1.0)?.with_seed(7);
//! let model = inject(config, model);
//! let out = model.forward(batch);
//! ```

pub mod config;
pub mod injector;
pub mod wrapper;

#[cfg(test)]
mod tests;

pub use config::{AlternateValue, InjectionConfig};
pub use injector::{process_seed, AnomalyFloat, Corruptible, InjectionStats, Injector, Passthrough};
pub use wrapper::{inject, Forward, Injected};
