//! Generator configuration
//!
//! Loaded from `.obsweave.yaml` (or an explicit path). Every field has a
//! default, so an empty file and no file at all behave the same.
//!
//! ```yaml
//! version: 1
//! namespace: MyApp.Generated
//! markers:
//!   traced: MyApp.Diagnostics.TracedAttribute
//! domains:
//!   genai: false
//! output:
//!   dir: obj/Generated
//!   mode: force
//! ```

use crate::error::{Error, Result};
use crate::guard::WriteMode;
use crate::providers::{ProviderDefinition, ProviderRegistry};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name looked up in the working directory
pub const CONFIG_FILE: &str = ".obsweave.yaml";

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Schema version for migrations
    pub version: u32,

    /// Namespace of generated interceptor classes
    pub namespace: String,

    /// Marker attribute names
    pub markers: MarkerConfig,

    /// Which interception domains run
    pub domains: DomainConfig,

    /// Let a traced marker on a base method apply to overrides
    pub inherit_traced: bool,

    /// Extra provider entries, appended after the built-in catalog
    pub providers: Vec<ProviderDefinition>,

    /// Where and how generated files are written
    pub output: OutputConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            version: 1,
            namespace: "Obsweave.Generated".into(),
            markers: MarkerConfig::default(),
            domains: DomainConfig::default(),
            inherit_traced: true,
            providers: Vec::new(),
            output: OutputConfig::default(),
        }
    }
}

/// Full metadata names of the marker attributes the classifiers look for
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct MarkerConfig {
    pub traced: String,
    pub traced_tag: String,
    pub no_trace: String,
    pub meter: String,
    pub counter: String,
    pub histogram: String,
    pub tag: String,
    /// Type whose visibility gates the whole pipeline (defaults to `traced`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gate: Option<String>,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            traced: "Obsweave.TracedAttribute".into(),
            traced_tag: "Obsweave.TracedTagAttribute".into(),
            no_trace: "Obsweave.NoTraceAttribute".into(),
            meter: "Obsweave.MeterAttribute".into(),
            counter: "Obsweave.CounterAttribute".into(),
            histogram: "Obsweave.HistogramAttribute".into(),
            tag: "Obsweave.TagAttribute".into(),
            gate: None,
        }
    }
}

impl MarkerConfig {
    pub fn gate(&self) -> &str {
        self.gate.as_deref().unwrap_or(&self.traced)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DomainConfig {
    pub traced: bool,
    pub database: bool,
    pub genai: bool,
    pub metrics: bool,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            traced: true,
            database: true,
            genai: true,
            metrics: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory generated units are written to
    pub dir: PathBuf,
    pub mode: WriteMode,
    /// Stamp a `// Generated:` line into written files
    pub timestamp: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("Generated"),
            mode: WriteMode::default(),
            timestamp: true,
        }
    }
}

impl GeneratorConfig {
    /// Parse config from YAML text
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: GeneratorConfig = serde_norway::from_str(yaml)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;

        if config.version != 1 {
            return Err(Error::Config(format!(
                "Unsupported config version: {}",
                config.version
            )));
        }

        Ok(config)
    }

    /// Load config from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(Error::Io)?;
        Self::from_yaml(&content)
    }

    /// Load `.obsweave.yaml` from `dir`, falling back to defaults when absent
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let file = dir.join(CONFIG_FILE);
        if !file.exists() {
            return Ok(Self::default());
        }
        Self::load(&file)
    }

    /// Provider registry for this config: built-ins plus extra entries
    pub fn registry(&self) -> ProviderRegistry {
        ProviderRegistry::with_extra(&self.providers)
    }
}
