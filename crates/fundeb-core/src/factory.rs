//! Handler registry and extraction factory.
//!
//! The registry maps a format tag (`"csv"`, `"pdf"`) to a constructor. The
//! handler configuration maps `module -> format -> {params}`. The factory
//! joins the two: it looks up the parameters for a module/format pair and
//! hands them to the registered constructor.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, OnceLock, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::extractors::{CsvHandler, FormatHandler};

/// Handler parameters as read from the configuration file.
pub type Params = serde_json::Map<String, serde_json::Value>;

/// Constructor bound to a format tag.
pub type HandlerConstructor = fn(&Params) -> Result<Box<dyn FormatHandler>, ConfigError>;

/// Format tag to constructor mapping.
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    constructors: BTreeMap<String, HandlerConstructor>,
}

impl HandlerRegistry {
    /// Registry with no formats.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with every handler compiled into this build.
    pub fn builtin() -> Self {
        let registry = Self::empty().with("csv", build_csv);

        #[cfg(feature = "pdf")]
        let registry = registry.with("pdf", build_pdf);

        registry
    }

    /// Add or replace a format.
    pub fn with(mut self, format_type: impl Into<String>, constructor: HandlerConstructor) -> Self {
        self.constructors.insert(format_type.into(), constructor);
        self
    }

    pub fn get(&self, format_type: &str) -> Option<HandlerConstructor> {
        self.constructors.get(format_type).copied()
    }

    /// Registered format tags, sorted.
    pub fn formats(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }
}

fn build_csv(params: &Params) -> Result<Box<dyn FormatHandler>, ConfigError> {
    Ok(Box::new(CsvHandler::from_params(params)?))
}

#[cfg(feature = "pdf")]
fn build_pdf(params: &Params) -> Result<Box<dyn FormatHandler>, ConfigError> {
    Ok(Box::new(crate::extractors::PdfHandler::from_params(params)?))
}

/// Configuration block for one format within a module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatConfig {
    /// Parameters forwarded to the handler constructor.
    #[serde(default)]
    pub params: Params,
}

/// Nested `module -> format -> {params}` mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerConfig {
    modules: BTreeMap<String, BTreeMap<String, FormatConfig>>,
}

impl HandlerConfig {
    /// Load from a file; `.json` is parsed as JSON, anything else as YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let load_err = |reason: String| ConfigError::Load {
            path: path.to_path_buf(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let config = if content.trim().is_empty() {
            Self::default()
        } else if is_json {
            serde_json::from_str(&content).map_err(|e| load_err(e.to_string()))?
        } else {
            Self::from_yaml_str(&content).map_err(|e| load_err(e.to_string()))?
        };

        if config.is_empty() {
            return Err(ConfigError::EmptyConfig(path.to_path_buf()));
        }
        Ok(config)
    }

    /// Parse YAML text. A document that is just `null` yields an empty config.
    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        let modules: Option<BTreeMap<String, BTreeMap<String, FormatConfig>>> =
            serde_yaml::from_str(content)?;
        Ok(Self {
            modules: modules.unwrap_or_default(),
        })
    }

    /// Add or replace the block for a module/format pair.
    pub fn insert(&mut self, module_name: &str, format_type: &str, params: Params) {
        self.modules
            .entry(module_name.to_string())
            .or_default()
            .insert(format_type.to_string(), FormatConfig { params });
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Module names, sorted.
    pub fn modules(&self) -> Vec<&str> {
        self.modules.keys().map(String::as_str).collect()
    }

    /// Format tags configured for a module.
    pub fn formats(&self, module_name: &str) -> Vec<&str> {
        self.modules
            .get(module_name)
            .map(|m| m.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

/// Builds format handlers from configuration and registry.
#[derive(Debug, Clone)]
pub struct ExtractionFactory {
    config: HandlerConfig,
    registry: HandlerRegistry,
}

impl ExtractionFactory {
    pub fn new(config: HandlerConfig, registry: HandlerRegistry) -> Self {
        info!(
            "Extraction factory ready: {} modules, formats [{}]",
            config.modules.len(),
            registry.formats().join(", ")
        );
        Self { config, registry }
    }

    /// Load the handler configuration and bind it to the builtin registry.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let config = HandlerConfig::from_file(path)?;
        info!("Loaded handler configuration from {}", path.display());
        Ok(Self::new(config, HandlerRegistry::builtin()))
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Build the handler configured for `module_name` / `format_type`.
    pub fn create_extractor(
        &self,
        module_name: &str,
        format_type: &str,
    ) -> Result<Box<dyn FormatHandler>, ConfigError> {
        let module = self
            .config
            .modules
            .get(module_name)
            .ok_or_else(|| ConfigError::ModuleNotFound(module_name.to_string()))?;

        let format = module
            .get(format_type)
            .ok_or_else(|| ConfigError::FormatNotFound {
                module: module_name.to_string(),
                format: format_type.to_string(),
            })?;

        let constructor = self
            .registry
            .get(format_type)
            .ok_or_else(|| ConfigError::UnregisteredType(format_type.to_string()))?;

        debug!(
            "Creating '{}' handler for module '{}' with params {:?}",
            format_type, module_name, format.params
        );
        constructor(&format.params)
    }
}

static FACTORY: OnceLock<ExtractionFactory> = OnceLock::new();
static FACTORY_INIT: Mutex<()> = Mutex::new(());

/// Process-wide factory, loaded from `config_path` on first call.
///
/// Later calls return the same instance and ignore `config_path`. A load
/// failure leaves the factory uninitialised.
pub fn get_factory(config_path: &Path) -> Result<&'static ExtractionFactory, ConfigError> {
    if let Some(factory) = FACTORY.get() {
        return Ok(factory);
    }

    let _guard = FACTORY_INIT.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(factory) = FACTORY.get() {
        return Ok(factory);
    }

    let factory = ExtractionFactory::from_file(config_path)?;
    Ok(FACTORY.get_or_init(|| factory))
}
