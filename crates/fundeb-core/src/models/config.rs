//! Configuration structures for the staging pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Main configuration for the fundeb pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Filesystem locations.
    pub paths: PathsConfig,

    /// Which files belong to which module.
    pub discovery: Vec<DiscoveryRule>,

    /// Extension to format-type mapping used for classification.
    pub extensions: ExtensionMap,

    /// Downstream transformation step.
    pub transform: TransformConfig,
}

/// Filesystem locations used by a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root of the raw source files; each module has a subdirectory.
    pub source_dir: PathBuf,

    /// Staging (bronze) directory receiving Parquet files.
    pub staging_dir: PathBuf,

    /// Handler configuration file (YAML or JSON).
    pub extractors_config: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("data/raw"),
            staging_dir: PathBuf::from("data/bronze"),
            extractors_config: PathBuf::from("config/extractors.yaml"),
        }
    }
}

/// A (module, glob pattern) pair describing which files belong to a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryRule {
    /// Module name; must match a key in the handler configuration.
    pub module: String,

    /// Glob pattern matched inside `source_dir/<module>/`.
    pub pattern: String,
}

impl DiscoveryRule {
    pub fn new(module: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            pattern: pattern.into(),
        }
    }

    /// Rules for the bank statement, investment and remittance modules.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("conta_corrente", "EXTRATO_BANCARIO_CC*.csv"),
            Self::new("conta_corrente", "EXTRATO_CC*.pdf"),
            Self::new("conta_investimentos", "INVEST_MES_*.csv"),
            Self::new("remessas_bancarias", "*.txt"),
        ]
    }
}

/// Maps lowercase file extensions (with leading dot) to handler format types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtensionMap(BTreeMap<String, String>);

impl ExtensionMap {
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self(entries)
    }

    /// Format type for a path, by case-insensitive extension.
    pub fn format_for(&self, path: &Path) -> Option<&str> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        self.0.get(&format!(".{}", ext)).map(String::as_str)
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.0
    }
}

impl Default for ExtensionMap {
    fn default() -> Self {
        let entries = [
            (".csv", "csv"),
            (".txt", "csv"),
            (".xlsx", "excel"),
            (".xls", "excel"),
            (".pdf", "pdf"),
        ]
        .into_iter()
        .map(|(ext, format)| (ext.to_string(), format.to_string()))
        .collect();
        Self(entries)
    }
}

/// External transformation command run after staging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Run the command after extraction.
    pub enabled: bool,

    /// Program to execute.
    pub command: String,

    /// Arguments passed to the program.
    pub args: Vec<String>,

    /// Working directory for the command.
    pub working_dir: PathBuf,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            command: "dbt".to_string(),
            args: vec!["run".to_string()],
            working_dir: PathBuf::from("dbt_transform"),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            discovery: DiscoveryRule::defaults(),
            extensions: ExtensionMap::default(),
            transform: TransformConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }

    /// Create the source and staging directories if missing.
    pub fn ensure_directories(&self) -> Result<(), std::io::Error> {
        crate::discovery::ensure_directory(&self.paths.source_dir)?;
        crate::discovery::ensure_directory(&self.paths.staging_dir)?;
        Ok(())
    }
}
