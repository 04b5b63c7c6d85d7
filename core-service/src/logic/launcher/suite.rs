//! Model suite definition: which scripts run, in which order, with which timeout.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_MODEL_TIMEOUT;
use crate::logic::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub name: String,
    pub script: PathBuf,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    DEFAULT_MODEL_TIMEOUT
}

impl ModelSpec {
    pub fn new(name: impl Into<String>, script: impl Into<PathBuf>, timeout_secs: u64) -> Self {
        Self { name: name.into(), script: script.into(), timeout_secs }
    }

    /// Folder the detector output of this model is attributed to.
    ///
    /// Whitespace and path separators become `_` so the name survives as a
    /// single-token `folder=` marker in the trace.
    pub fn folder(&self) -> String {
        let raw = self
            .script
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .unwrap_or(self.name.as_str());
        raw.chars()
            .map(|c| if c.is_whitespace() || c == '/' || c == '\\' { '_' } else { c })
            .collect()
    }
}

/// Ordered list of models; executed strictly one after another
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSuite {
    pub models: Vec<ModelSpec>,
}

impl ModelSuite {
    /// The reference model set laid out under `base_dir`.
    pub fn default_for(base_dir: &Path) -> Self {
        let models = vec![
            ModelSpec::new("Simple ResNet", base_dir.join("simple_resnet").join("inference_fixed.py"), 180),
            ModelSpec::new("Simple GAN", base_dir.join("simple_gan").join("simple_gan.py"), 300),
            ModelSpec::new("Autoencoder", base_dir.join("autoencoder").join("autoencoder.py"), 180),
            ModelSpec::new("CNN Autoencoder", base_dir.join("autoencoder").join("cnn_autoencoder.py"), 300),
            ModelSpec::new(
                "Vision Transformer",
                base_dir.join("vision_transformer").join("vision_transformer.py"),
                600,
            ),
            ModelSpec::new("Stock LSTM", base_dir.join("stock_lstm").join("stock_lstm.py"), 300),
        ];
        Self { models }
    }

    /// Load a suite from JSON. Relative script paths resolve against the
    /// file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read(path)?;
        let mut suite: ModelSuite = serde_json::from_slice(&data)?;

        if let Some(dir) = path.parent() {
            for model in &mut suite.models {
                if model.script.is_relative() {
                    model.script = dir.join(&model.script);
                }
            }
        }
        Ok(suite)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
