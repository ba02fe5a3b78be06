//! Preset and import service factories
//!
//! [`PresetFactory`] turns a [`PresetConfig`] into a wired [`Preset`] using
//! registries of named connector factories and data processors.
//! [`ImportServiceFactory`] owns the loaded [`Config`] and builds ready to
//! run [`ImportService`]s by preset name.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::config::{Config, ConfigError, PresetConfig};
use crate::domain::RecordSet;
use crate::mapper::FieldMapper;
use crate::options_schema::Options;
use crate::ports::{
    IDataSource, IDataSourceFactory, IDataTarget, IDataTargetFactory, IExpressionEvaluator,
    IImportObserver,
};
use crate::preset::{DataProcessor, Preset, PresetOptions};
use crate::usecases::ImportService;

// ============================================================================
// PresetFactory
// ============================================================================

/// Builds presets from configuration
pub struct PresetFactory {
    sources: HashMap<String, Arc<dyn IDataSourceFactory>>,
    targets: HashMap<String, Arc<dyn IDataTargetFactory>>,
    processors: HashMap<String, DataProcessor>,
    evaluator: Arc<dyn IExpressionEvaluator>,
    fixture_source: Option<Arc<dyn IDataSourceFactory>>,
}

impl PresetFactory {
    /// Creates an empty registry using `evaluator` for mapping expressions
    pub fn new(evaluator: Arc<dyn IExpressionEvaluator>) -> Self {
        Self {
            sources: HashMap::new(),
            targets: HashMap::new(),
            processors: HashMap::new(),
            evaluator,
            fixture_source: None,
        }
    }

    /// Register a source factory under `name`
    #[must_use]
    pub fn with_source_factory(
        mut self,
        name: impl Into<String>,
        factory: Arc<dyn IDataSourceFactory>,
    ) -> Self {
        self.sources.insert(name.into(), factory);
        self
    }

    /// Register a target factory under `name`
    #[must_use]
    pub fn with_target_factory(
        mut self,
        name: impl Into<String>,
        factory: Arc<dyn IDataTargetFactory>,
    ) -> Self {
        self.targets.insert(name.into(), factory);
        self
    }

    /// Register a data processor presets can refer to by `name`
    #[must_use]
    pub fn with_data_processor<F>(mut self, name: impl Into<String>, processor: F) -> Self
    where
        F: Fn(RecordSet) -> anyhow::Result<RecordSet> + Send + Sync + 'static,
    {
        self.processors.insert(name.into(), Arc::new(processor));
        self
    }

    /// Set the factory building fixture sources (`run --from-fixture`)
    #[must_use]
    pub fn with_fixture_source_factory(mut self, factory: Arc<dyn IDataSourceFactory>) -> Self {
        self.fixture_source = Some(factory);
        self
    }

    /// Build the preset `name` described by `config`
    ///
    /// Overrides are merged over the configured connector options before
    /// they are validated.
    pub fn create(
        &self,
        name: &str,
        config: &PresetConfig,
        source_overrides: Option<&Options>,
        target_overrides: Option<&Options>,
    ) -> Result<Preset, ConfigError> {
        let source_config = config
            .source
            .as_ref()
            .ok_or_else(|| missing(name, "source"))?;
        let factory_name = source_config
            .factory
            .as_deref()
            .ok_or_else(|| missing(name, "source.factory"))?;
        let factory = self.sources.get(factory_name).ok_or_else(|| ConfigError::UnknownFactory {
            preset: name.to_string(),
            kind: "source",
            name: factory_name.to_string(),
        })?;

        let options = with_overrides(&source_config.options, source_overrides);
        let source = Self::create_source(name, factory_name, factory.as_ref(), &options)?;
        self.create_with_source(name, config, source, target_overrides)
    }

    /// Build the preset `name` reading from `source` instead of the configured source
    pub fn create_with_source(
        &self,
        name: &str,
        config: &PresetConfig,
        source: Arc<dyn IDataSource>,
        target_overrides: Option<&Options>,
    ) -> Result<Preset, ConfigError> {
        let mapping = config
            .mapping
            .as_ref()
            .ok_or_else(|| missing(name, "mapping"))?;
        let mapper = FieldMapper::from_config(mapping, Arc::clone(&self.evaluator))
            .map_err(|source| ConfigError::Mapping {
                preset: name.to_string(),
                source,
            })?;
        let mapper = Arc::new(mapper);

        let target_config = config
            .target
            .as_ref()
            .ok_or_else(|| missing(name, "target"))?;
        let factory_name = target_config
            .factory
            .as_deref()
            .ok_or_else(|| missing(name, "target.factory"))?;
        let factory = self.targets.get(factory_name).ok_or_else(|| ConfigError::UnknownFactory {
            preset: name.to_string(),
            kind: "target",
            name: factory_name.to_string(),
        })?;

        let options = with_overrides(&target_config.options, target_overrides);
        factory
            .options_schema()
            .validate(&options)
            .map_err(|source| ConfigError::InvalidOptions {
                preset: name.to_string(),
                kind: "target",
                factory: factory_name.to_string(),
                source,
            })?;
        let target: Arc<dyn IDataTarget> = factory
            .create(Arc::clone(&mapper), &options)
            .map_err(|source| ConfigError::Connector {
                preset: name.to_string(),
                kind: "target",
                factory: factory_name.to_string(),
                source,
            })?;

        let data_processor = match &config.options.data_processor {
            None => None,
            Some(processor) => Some(Arc::clone(self.processors.get(processor).ok_or_else(
                || ConfigError::UnknownDataProcessor {
                    preset: name.to_string(),
                    name: processor.clone(),
                },
            )?)),
        };
        let options = PresetOptions {
            skip_added_records: config.options.skip_added_records,
            skip_removed_records: config.options.skip_removed_records,
            data_processor,
        };

        debug!(preset = name, target = factory_name, "Preset created");
        Ok(Preset::new(source, target)
            .with_mapper(mapper)
            .with_options(options))
    }

    /// Build the fixture source for preset `name`
    pub fn create_fixture_source(
        &self,
        name: &str,
        options: &Options,
    ) -> Result<Arc<dyn IDataSource>, ConfigError> {
        let factory = self
            .fixture_source
            .as_ref()
            .ok_or(ConfigError::NoFixtureFactory)?;
        Self::create_source(name, "fixture", factory.as_ref(), options)
    }

    fn create_source(
        name: &str,
        factory_name: &str,
        factory: &dyn IDataSourceFactory,
        options: &Options,
    ) -> Result<Arc<dyn IDataSource>, ConfigError> {
        factory
            .options_schema()
            .validate(options)
            .map_err(|source| ConfigError::InvalidOptions {
                preset: name.to_string(),
                kind: "source",
                factory: factory_name.to_string(),
                source,
            })?;
        factory.create(options).map_err(|source| ConfigError::Connector {
            preset: name.to_string(),
            kind: "source",
            factory: factory_name.to_string(),
            source,
        })
    }
}

impl fmt::Debug for PresetFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sources: Vec<_> = self.sources.keys().collect();
        let mut targets: Vec<_> = self.targets.keys().collect();
        sources.sort();
        targets.sort();
        f.debug_struct("PresetFactory")
            .field("sources", &sources)
            .field("targets", &targets)
            .field("processors", &self.processors.len())
            .field("fixture_source", &self.fixture_source.is_some())
            .finish()
    }
}

fn missing(preset: &str, setting: &str) -> ConfigError {
    ConfigError::MissingSetting {
        preset: preset.to_string(),
        setting: setting.to_string(),
    }
}

fn with_overrides(options: &Options, overrides: Option<&Options>) -> Options {
    let mut merged = options.clone();
    if let Some(overrides) = overrides {
        merged.extend(overrides.clone());
    }
    merged
}

// ============================================================================
// ImportServiceFactory
// ============================================================================

/// Builds import services for configured presets
pub struct ImportServiceFactory {
    config: Config,
    presets: PresetFactory,
    observers: Vec<Arc<dyn IImportObserver>>,
}

impl ImportServiceFactory {
    pub fn new(config: Config, presets: PresetFactory) -> Self {
        Self {
            config,
            presets,
            observers: Vec::new(),
        }
    }

    /// Observer attached to every service this factory creates
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn IImportObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Names of all configured presets, sorted
    pub fn preset_names(&self) -> Vec<String> {
        self.config.preset_names()
    }

    /// Configuration of `name` with its template merged in
    pub fn preset_configuration(&self, name: &str) -> Result<PresetConfig, ConfigError> {
        self.config.preset_config(name)
    }

    /// Service for preset `name`, with optional connector option overrides
    pub fn create(
        &self,
        name: &str,
        source_overrides: Option<&Options>,
        target_overrides: Option<&Options>,
    ) -> Result<ImportService, ConfigError> {
        let config = self.preset_configuration(name)?;
        let preset = self
            .presets
            .create(name, &config, source_overrides, target_overrides)?;
        Ok(self.create_from_preset(preset))
    }

    /// Service for an already wired preset
    pub fn create_from_preset(&self, preset: Preset) -> ImportService {
        self.observers
            .iter()
            .fold(ImportService::new(preset), |service, observer| {
                service.with_observer(Arc::clone(observer))
            })
    }

    /// Service for preset `name` reading from `source`
    pub fn create_with_source(
        &self,
        name: &str,
        source: Arc<dyn IDataSource>,
    ) -> Result<ImportService, ConfigError> {
        let config = self.preset_configuration(name)?;
        let preset = self.presets.create_with_source(name, &config, source, None)?;
        Ok(self.create_from_preset(preset))
    }

    /// Service for preset `name` reading from its configured fixture file
    ///
    /// Requires `source.fixture.file`; the id attribute defaults to `id`.
    pub fn create_with_fixture(
        &self,
        name: &str,
        target_overrides: Option<&Options>,
    ) -> Result<ImportService, ConfigError> {
        let config = self.preset_configuration(name)?;
        let fixture = config
            .source
            .as_ref()
            .and_then(|source| source.fixture.as_ref())
            .filter(|fixture| fixture.file.is_some())
            .ok_or_else(|| ConfigError::MissingFixture(name.to_string()))?;

        let mut options = Options::new();
        if let Some(file) = &fixture.file {
            options.insert(
                "file_path".to_string(),
                Value::String(file.to_string_lossy().into_owned()),
            );
        }
        options.insert(
            "id_attribute".to_string(),
            Value::String(fixture.id_attribute.clone().unwrap_or_else(|| "id".to_string())),
        );
        if let Some(version) = &fixture.version_attribute {
            options.insert("version_attribute".to_string(), Value::String(version.clone()));
        }

        let source = self.presets.create_fixture_source(name, &options)?;
        let preset = self
            .presets
            .create_with_source(name, &config, source, target_overrides)?;
        debug!(preset = name, "Using fixture source");
        Ok(self.create_from_preset(preset))
    }
}

impl fmt::Debug for ImportServiceFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportServiceFactory")
            .field("presets", &self.config.preset_names())
            .field("factory", &self.presets)
            .field("observers", &self.observers.len())
            .finish()
    }
}
