//! Injection Configuration
//!
//! Validated once at construction; immutable for the rest of the run.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{ENV_ALTERNATE, ENV_CORRUPTION_PROBABILITY, ENV_NAN_FRACTION, ENV_SEED};
use crate::logic::error::ConfigError;

/// Value written to corrupted elements that do not become NaN
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlternateValue {
    #[default]
    PositiveInfinity,
    NegativeInfinity,
    /// +Inf or -Inf, sign drawn per element with equal odds
    MixedInfinity,
    /// Largest finite value of the element type
    Extreme,
}

impl AlternateValue {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlternateValue::PositiveInfinity => "positive_infinity",
            AlternateValue::NegativeInfinity => "negative_infinity",
            AlternateValue::MixedInfinity => "mixed_infinity",
            AlternateValue::Extreme => "extreme",
        }
    }
}

impl FromStr for AlternateValue {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive_infinity" | "posinf" | "+inf" | "inf" => Ok(AlternateValue::PositiveInfinity),
            "negative_infinity" | "neginf" | "-inf" => Ok(AlternateValue::NegativeInfinity),
            "mixed_infinity" | "mixed" | "±inf" => Ok(AlternateValue::MixedInfinity),
            "extreme" | "max" => Ok(AlternateValue::Extreme),
            other => Err(ConfigError::UnknownAlternate(other.to_string())),
        }
    }
}

impl fmt::Display for AlternateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawInjectionConfig")]
pub struct InjectionConfig {
    corruption_probability: f64,
    nan_fraction: f64,
    alternate: AlternateValue,
    seed: Option<u64>,
}

/// Unvalidated form, as read from a config file
#[derive(Deserialize)]
struct RawInjectionConfig {
    corruption_probability: f64,
    #[serde(default = "default_nan_fraction")]
    nan_fraction: f64,
    #[serde(default)]
    alternate: AlternateValue,
    #[serde(default)]
    seed: Option<u64>,
}

fn default_nan_fraction() -> f64 {
    1.0
}

impl TryFrom<RawInjectionConfig> for InjectionConfig {
    type Error = ConfigError;

    fn try_from(raw: RawInjectionConfig) -> Result<Self, Self::Error> {
        let config = InjectionConfig::new(raw.corruption_probability, raw.nan_fraction)?
            .with_alternate(raw.alternate);
        Ok(match raw.seed {
            Some(seed) => config.with_seed(seed),
            None => config,
        })
    }
}

fn unit_interval(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::OutOfRange { name, value })
    }
}

impl InjectionConfig {
    /// Fails on probabilities outside [0, 1] (including NaN); never clamps.
    pub fn new(corruption_probability: f64, nan_fraction: f64) -> Result<Self, ConfigError> {
        Ok(Self {
            corruption_probability: unit_interval("corruption_probability", corruption_probability)?,
            nan_fraction: unit_interval("nan_fraction", nan_fraction)?,
            alternate: AlternateValue::default(),
            seed: None,
        })
    }

    /// Injection turned off; wrapping with this config is a no-op.
    pub fn disabled() -> Self {
        Self {
            corruption_probability: 0.0,
            nan_fraction: 1.0,
            alternate: AlternateValue::default(),
            seed: None,
        }
    }

    pub fn with_alternate(mut self, alternate: AlternateValue) -> Self {
        self.alternate = alternate;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn corruption_probability(&self) -> f64 {
        self.corruption_probability
    }

    pub fn nan_fraction(&self) -> f64 {
        self.nan_fraction
    }

    pub fn alternate(&self) -> AlternateValue {
        self.alternate
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn is_enabled(&self) -> bool {
        self.corruption_probability > 0.0
    }

    /// Read the configuration handed to a model process by the launcher.
    ///
    /// Returns `None` when no corruption probability is exported.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&'static str) -> Option<String>) -> Result<Option<Self>, ConfigError> {
        let parse_f64 = |key: &'static str, value: String| {
            value.trim().parse::<f64>().map_err(|_| ConfigError::InvalidEnv { key, value })
        };

        let probability = match lookup(ENV_CORRUPTION_PROBABILITY) {
            Some(value) => parse_f64(ENV_CORRUPTION_PROBABILITY, value)?,
            None => return Ok(None),
        };
        let nan_fraction = match lookup(ENV_NAN_FRACTION) {
            Some(value) => parse_f64(ENV_NAN_FRACTION, value)?,
            None => default_nan_fraction(),
        };

        let mut config = Self::new(probability, nan_fraction)?;
        if let Some(value) = lookup(ENV_ALTERNATE) {
            config = config.with_alternate(value.parse()?);
        }
        if let Some(value) = lookup(ENV_SEED) {
            let seed = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { key: ENV_SEED, value })?;
            config = config.with_seed(seed);
        }
        Ok(Some(config))
    }

    /// Environment variables exporting this config to a child process
    pub fn to_env(&self) -> Vec<(&'static str, String)> {
        let mut vars = vec![
            (ENV_CORRUPTION_PROBABILITY, self.corruption_probability.to_string()),
            (ENV_NAN_FRACTION, self.nan_fraction.to_string()),
            (ENV_ALTERNATE, self.alternate.as_str().to_string()),
        ];
        if let Some(seed) = self.seed {
            vars.push((ENV_SEED, seed.to_string()));
        }
        vars
    }
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self::disabled()
    }
}
