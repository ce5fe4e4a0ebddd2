//! Subcommands and the configuration loading they share.

pub mod config;
pub mod discover;
pub mod extract;
pub mod run;

use std::path::{Path, PathBuf};

use tracing::debug;

use fundeb_core::PipelineConfig;

/// `<config dir>/fundeb/config.json`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fundeb")
        .join("config.json")
}

/// The explicit path if given, else the default path.
pub fn resolve_config_path(config_path: Option<&str>) -> PathBuf {
    config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path)
}

/// Load the pipeline configuration.
///
/// An explicit path must exist. Without one, the default file is used when
/// present and built-in defaults otherwise.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<PipelineConfig> {
    if let Some(path) = config_path {
        let path = Path::new(path);
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        debug!("Loading config from {}", path.display());
        return Ok(PipelineConfig::from_file(path)?);
    }

    let default_path = default_config_path();
    if default_path.exists() {
        debug!("Loading config from {}", default_path.display());
        Ok(PipelineConfig::from_file(&default_path)?)
    } else {
        debug!("No config file found, using defaults");
        Ok(PipelineConfig::default())
    }
}
