//! Pipeline Configuration
//!
//! Layering: built-in defaults, then an optional JSON file, then environment
//! (`NANTRACE_*`), then command line flags applied by the binary.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CORRUPTION_PROBABILITY,
    DEFAULT_DETECTOR_LIB,
    DEFAULT_OUTPUT_DIR,
    DEFAULT_PYTHON,
    ENV_DETECTOR_LIB,
    ENV_FORMAT,
    ENV_OUTPUT_DIR,
    ENV_OVERFLOW,
    ENV_PYTHON,
};
use crate::logic::error::ConfigError;
use crate::logic::inject::InjectionConfig;
use crate::logic::launcher::ModelSuite;
use crate::logic::report::{ExportFormat, OverflowThreshold};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// When an INSTs cell moves to a detail page
    pub overflow: OverflowThreshold,

    /// Directory receiving the tabular and hierarchical reports
    pub output_dir: PathBuf,

    pub format: ExportFormat,

    /// Native detector preloaded into model processes
    pub detector_library: String,

    pub interpreter: String,

    /// Suite definition file; the default six-model suite is used when unset
    pub suite: Option<PathBuf>,

    /// Base directory of the default suite
    pub models_dir: PathBuf,

    /// Corruption settings of the injected regime
    pub injection: Option<InjectionConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            overflow: OverflowThreshold::default(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            format: ExportFormat::default(),
            detector_library: DEFAULT_DETECTOR_LIB.to_string(),
            interpreter: DEFAULT_PYTHON.to_string(),
            suite: None,
            models_dir: PathBuf::from("."),
            injection: None,
        }
    }
}

impl PipelineConfig {
    /// Read a JSON config file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read(path)?;
        let config = serde_json::from_slice(&data)?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            log::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    /// Overlay `NANTRACE_*` variables from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn apply_lookup(&mut self, lookup: impl Fn(&'static str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(raw) = lookup(ENV_OVERFLOW) {
            self.overflow = raw.parse()?;
        }
        if let Some(raw) = lookup(ENV_FORMAT) {
            self.format = raw.parse()?;
        }
        if let Some(dir) = lookup(ENV_OUTPUT_DIR).filter(|v| !v.trim().is_empty()) {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(lib) = lookup(ENV_DETECTOR_LIB).filter(|v| !v.trim().is_empty()) {
            self.detector_library = lib;
        }
        if let Some(python) = lookup(ENV_PYTHON).filter(|v| !v.trim().is_empty()) {
            self.interpreter = python;
        }
        Ok(())
    }

    /// Injection settings for a corrupted run
    pub fn injection_or_default(&self) -> Result<InjectionConfig, ConfigError> {
        match self.injection {
            Some(config) => Ok(config),
            None => InjectionConfig::new(DEFAULT_CORRUPTION_PROBABILITY, 1.0),
        }
    }

    pub fn model_suite(&self) -> Result<ModelSuite, ConfigError> {
        match &self.suite {
            Some(path) => ModelSuite::load(path),
            None => Ok(ModelSuite::default_for(&self.models_dir)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&'static str, &str)]) -> impl Fn(&'static str) -> Option<String> {
        let map: HashMap<&'static str, String> = vars.iter().map(|(k, v)| (*k, v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.overflow, OverflowThreshold::Chars(32_767));
        assert_eq!(config.format, ExportFormat::Csv);
        assert_eq!(config.output_dir, PathBuf::from("nantrace_report"));
        assert!(config.injection.is_none());
        assert_eq!(config.injection_or_default().unwrap().corruption_probability(), 0.05);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"overflow": "entries:100", "format": "jsonl", "injection": {"corruption_probability": 0.1, "seed": 4}}"#,
        )
        .unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.overflow, OverflowThreshold::Entries(100));
        assert_eq!(config.format, ExportFormat::Jsonl);
        assert_eq!(config.interpreter, "python3");
        assert_eq!(config.injection_or_default().unwrap().seed(), Some(4));
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        fs::write(&path, r#"{"overflow": "chars:0"}"#).unwrap();
        assert!(matches!(PipelineConfig::load(&path), Err(ConfigError::Json(_))));

        fs::write(&path, r#"{"injection": {"corruption_probability": 1.5}}"#).unwrap();
        assert!(PipelineConfig::load(&path).is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::load_or_default(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = PipelineConfig::default();
        config.overflow = OverflowThreshold::Entries(12);
        config.injection = Some(InjectionConfig::new(0.2, 0.5).unwrap().with_seed(1));
        config.save(&path).unwrap();

        assert_eq!(PipelineConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_env_overlay() {
        let mut config = PipelineConfig::default();
        config
            .apply_lookup(lookup(&[
                (ENV_OVERFLOW, "entries:5"),
                (ENV_FORMAT, "JSON"),
                (ENV_OUTPUT_DIR, "/tmp/out"),
                (ENV_PYTHON, "python3.11"),
                (ENV_DETECTOR_LIB, ""),
            ]))
            .unwrap();

        assert_eq!(config.overflow, OverflowThreshold::Entries(5));
        assert_eq!(config.format, ExportFormat::Json);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.interpreter, "python3.11");
        assert_eq!(config.detector_library, DEFAULT_DETECTOR_LIB);
    }

    #[test]
    fn test_env_overlay_errors() {
        let mut config = PipelineConfig::default();
        assert!(matches!(
            config.apply_lookup(lookup(&[(ENV_OVERFLOW, "rows:3")])),
            Err(ConfigError::ThresholdSyntax(_))
        ));
        assert!(matches!(
            config.apply_lookup(lookup(&[(ENV_FORMAT, "xlsx")])),
            Err(ConfigError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_model_suite_source() {
        let mut config = PipelineConfig::default();
        config.models_dir = PathBuf::from("/work/models");
        let suite = config.model_suite().unwrap();
        assert_eq!(suite.len(), 6);
        assert!(suite.models[0].script.starts_with("/work/models"));

        config.suite = Some(PathBuf::from("/nonexistent/suite.json"));
        assert!(matches!(config.model_suite(), Err(ConfigError::Io(_))));
    }
}
