//! Connector registry of the `recsync` binary
//!
//! Maps the factory names presets refer to onto the reference connectors.

use std::sync::Arc;

use recsync_connectors::{
    FileSourceFactory, JsonFileTargetFactory, MemoryTargetFactory, NullExpressionEvaluator,
};
use recsync_core::ports::{IDataSourceFactory, IDataTargetFactory};
use recsync_core::{Config, ImportServiceFactory, PresetFactory};

/// Source factories by the name presets use
pub fn source_factories() -> Vec<(&'static str, Arc<dyn IDataSourceFactory>)> {
    let file: Arc<dyn IDataSourceFactory> = Arc::new(FileSourceFactory);
    vec![("file", file)]
}

/// Target factories by the name presets use
pub fn target_factories() -> Vec<(&'static str, Arc<dyn IDataTargetFactory>)> {
    let json_file: Arc<dyn IDataTargetFactory> = Arc::new(JsonFileTargetFactory);
    let memory: Arc<dyn IDataTargetFactory> = Arc::new(MemoryTargetFactory);
    vec![("json_file", json_file), ("memory", memory)]
}

/// Preset factory with every connector shipped with recsync
pub fn preset_factory() -> PresetFactory {
    let mut factory = PresetFactory::new(Arc::new(NullExpressionEvaluator))
        .with_fixture_source_factory(Arc::new(FileSourceFactory));
    for (name, source) in source_factories() {
        factory = factory.with_source_factory(name, source);
    }
    for (name, target) in target_factories() {
        factory = factory.with_target_factory(name, target);
    }
    factory
}

pub fn service_factory(config: Config) -> ImportServiceFactory {
    ImportServiceFactory::new(config, preset_factory())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_listed_factory_is_registered() {
        let debug = format!("{:?}", preset_factory());
        let sources = source_factories();
        let targets = target_factories();
        for name in sources.iter().map(|(n, _)| n).chain(targets.iter().map(|(n, _)| n)) {
            assert!(debug.contains(name), "{} not registered", name);
        }
    }

    #[test]
    fn test_memory_preset_wires_from_config() {
        let config = Config::from_yaml(
            "presets:\n  demo:\n    source:\n      factory: file\n      options:\n        file_path: /tmp/none.json\n    target:\n      factory: memory\n    mapping:\n      title: name\n",
        )
        .unwrap();
        assert!(service_factory(config).create("demo", None, None).is_ok());
    }
}
