//! Configuration module for recsync.
//!
//! Provides typed configuration structs that map to the YAML configuration
//! file, with loading, validation, defaults and preset template resolution.
//!
//! ```yaml
//! logging:
//!   level: info
//! preset_templates:
//!   json_export:
//!     target:
//!       factory: json_file
//!       options:
//!         batch_size: 100
//! presets:
//!   products:
//!     template: json_export
//!     source:
//!       factory: file
//!       options:
//!         file_path: /srv/import/products.json
//!         version_attribute: updated_at
//!       fixture:
//!         file: /srv/import/fixtures/products.json
//!     target:
//!       options:
//!         file_path: /var/lib/recsync/products.json
//!     mapping:
//!       title: name
//!       price: price
//!     options:
//!       skip_removed_records: true
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::mapper::MappingError;
use crate::options_schema::{Options, OptionsError};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for recsync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    /// Raw preset definitions, keyed by preset name.
    pub presets: BTreeMap<String, Value>,
    /// Reusable preset fragments referenced through `template`.
    pub preset_templates: BTreeMap<String, Value>,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum level: trace, debug, info, warn or error.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Fully resolved configuration of a single preset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresetConfig {
    pub source: Option<SourceConfig>,
    pub target: Option<TargetConfig>,
    pub mapping: Option<serde_json::Map<String, Value>>,
    #[serde(default)]
    pub options: PresetOptionsConfig,
}

/// `source` section of a preset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Name of a registered source factory.
    pub factory: Option<String>,
    #[serde(default)]
    pub options: Options,
    /// Fixture used by `run --from-fixture`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixture: Option<FixtureConfig>,
}

/// `target` section of a preset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Name of a registered target factory.
    pub factory: Option<String>,
    #[serde(default)]
    pub options: Options,
}

/// Fixture file replacing the configured source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixtureConfig {
    pub file: Option<PathBuf>,
    pub id_attribute: Option<String>,
    pub version_attribute: Option<String>,
}

/// Policy options of a preset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PresetOptionsConfig {
    pub skip_added_records: bool,
    pub skip_removed_records: bool,
    /// Name of a registered data processor.
    pub data_processor: Option<String>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while loading configuration or wiring a preset.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Preset \"{0}\" is not configured")]
    UnknownPreset(String),

    #[error("Preset \"{preset}\" refers to unknown template \"{template}\"")]
    UnknownTemplate { preset: String, template: String },

    #[error("Invalid configuration for preset \"{preset}\": {message}")]
    InvalidPreset { preset: String, message: String },

    #[error("Missing \"{setting}\" configuration for preset \"{preset}\"")]
    MissingSetting { preset: String, setting: String },

    #[error("The configured \"{kind}.factory\" {name} of preset \"{preset}\" is not registered")]
    UnknownFactory {
        preset: String,
        kind: &'static str,
        name: String,
    },

    #[error("Failed to create data {kind} for factory {factory} of preset \"{preset}\": {source}")]
    InvalidOptions {
        preset: String,
        kind: &'static str,
        factory: String,
        #[source]
        source: OptionsError,
    },

    #[error("Exception while instantiating data {kind} ({factory}) of preset \"{preset}\"")]
    Connector {
        preset: String,
        kind: &'static str,
        factory: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Exception while instantiating mapper of preset \"{preset}\": {source}")]
    Mapping {
        preset: String,
        #[source]
        source: MappingError,
    },

    #[error("Data processor \"{name}\" of preset \"{preset}\" is not registered")]
    UnknownDataProcessor { preset: String, name: String },

    #[error("Preset \"{0}\" has no fixture configured (source.fixture.file)")]
    MissingFixture(String),

    #[error("No fixture source factory is registered")]
    NoFixtureFactory,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        let config: Config = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/recsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("recsync")
            .join("config.yaml")
    }

    /// Add or replace a raw preset definition.
    #[must_use]
    pub fn with_preset(mut self, name: impl Into<String>, preset: Value) -> Self {
        self.presets.insert(name.into(), preset);
        self
    }

    /// Add or replace a preset template.
    #[must_use]
    pub fn with_template(mut self, name: impl Into<String>, template: Value) -> Self {
        self.preset_templates.insert(name.into(), template);
        self
    }

    /// Names of all configured presets, sorted.
    pub fn preset_names(&self) -> Vec<String> {
        self.presets.keys().cloned().collect()
    }

    /// Raw preset definition with its template merged in.
    ///
    /// Template values are merged recursively below the preset; values of
    /// the preset win.
    pub fn resolved_preset(&self, name: &str) -> Result<Value, ConfigError> {
        let raw = self
            .presets
            .get(name)
            .ok_or_else(|| ConfigError::UnknownPreset(name.to_string()))?;

        let mut preset = raw.clone();
        let template_name = match preset.as_object_mut() {
            Some(map) => match map.remove("template") {
                None | Some(Value::Null) => None,
                Some(Value::String(template)) => Some(template),
                Some(other) => {
                    return Err(ConfigError::InvalidPreset {
                        preset: name.to_string(),
                        message: format!("\"template\" must be a string, got {}", other),
                    })
                }
            },
            None => None,
        };

        match template_name {
            None => Ok(preset),
            Some(template) => {
                let base = self.preset_templates.get(&template).ok_or_else(|| {
                    ConfigError::UnknownTemplate {
                        preset: name.to_string(),
                        template: template.clone(),
                    }
                })?;
                Ok(merge_values(base.clone(), preset))
            }
        }
    }

    /// Typed configuration of a preset.
    pub fn preset_config(&self, name: &str) -> Result<PresetConfig, ConfigError> {
        let resolved = self.resolved_preset(name)?;
        serde_json::from_value(resolved).map_err(|err| ConfigError::InvalidPreset {
            preset: name.to_string(),
            message: err.to_string(),
        })
    }
}

/// Recursively merge `overlay` into `base`; scalar and array values of
/// `overlay` replace those of `base`.
pub fn merge_values(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let merged = match base.remove(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => value,
                };
                base.insert(key, merged);
            }
            Value::Object(base)
        }
        (_, overlay) => overlay,
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"presets.products"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// Checks the log level and that every preset resolves to a typed
    /// preset configuration. Factory names are checked later, when a
    /// preset is instantiated. An empty vector means the configuration is
    /// valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}', expected one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        for name in self.presets.keys() {
            if let Err(err) = self.preset_config(name) {
                errors.push(ValidationError {
                    field: format!("presets.{}", name),
                    message: err.to_string(),
                });
            }
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
