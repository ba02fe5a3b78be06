//! Integration tests for PresetFactory and ImportServiceFactory
//!
//! These tests wire presets from YAML configuration using in-test
//! connector factories and verify option validation, overrides, template
//! resolution and fixture substitution.

mod common;

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};

use common::{RecordingObserver, RecordingTarget, StaticSource};
use recsync_core::domain::{Attributes, RecordSet};
use recsync_core::ports::{
    IDataSource, IDataSourceFactory, IDataTarget, IDataTargetFactory, IExpressionEvaluator,
};
use recsync_core::{
    Config, ConfigError, FieldMapper, ImportServiceFactory, OptionType, Options, OptionsSchema,
    PresetFactory,
};

// ============================================================================
// Test connectors
// ============================================================================

/// Source factory remembering the options it was called with
#[derive(Default)]
struct RowsSourceFactory {
    seen: Mutex<Vec<Options>>,
}

impl IDataSourceFactory for RowsSourceFactory {
    fn options_schema(&self) -> OptionsSchema {
        OptionsSchema::new()
            .requires("file_path", OptionType::String)
            .has("id_attribute", OptionType::String)
            .has("version_attribute", OptionType::String)
    }

    fn create(&self, options: &Options) -> anyhow::Result<Arc<dyn IDataSource>> {
        self.seen.lock().push(options.clone());
        let id = options
            .get("file_path")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let mut row = Attributes::new();
        row.insert("id".to_string(), Value::String(id));
        let records = RecordSet::from_raw_rows([row], "id", None)?;
        Ok(Arc::new(StaticSource::new(records)))
    }
}

#[derive(Default)]
struct RecordingTargetFactory {
    seen: Mutex<Vec<(Vec<String>, Options)>>,
}

impl IDataTargetFactory for RecordingTargetFactory {
    fn options_schema(&self) -> OptionsSchema {
        OptionsSchema::new().has("table", OptionType::String)
    }

    fn create(
        &self,
        mapper: Arc<FieldMapper>,
        options: &Options,
    ) -> anyhow::Result<Arc<dyn IDataTarget>> {
        let fields = mapper.fields().map(str::to_string).collect();
        self.seen.lock().push((fields, options.clone()));
        Ok(Arc::new(RecordingTarget::new()))
    }
}

struct NoExpressions;

impl IExpressionEvaluator for NoExpressions {
    fn is_expression(&self, _text: &str) -> bool {
        false
    }

    fn evaluate(&self, expression: &str, _variables: &Attributes) -> anyhow::Result<Value> {
        Err(anyhow::anyhow!("unexpected expression {}", expression))
    }
}

// ============================================================================
// Test helpers
// ============================================================================

const YAML: &str = r#"
preset_templates:
  base:
    target:
      factory: recording
      options:
        table: base_table
presets:
  products:
    template: base
    source:
      factory: rows
      options:
        file_path: product-1
      fixture:
        file: fixture-1
        version_attribute: tstamp
    mapping:
      title: name
  filtered:
    template: base
    source:
      factory: rows
      options:
        file_path: keep
    mapping:
      title: name
    options:
      data_processor: drop_all
  unknown_source:
    source:
      factory: database
    target:
      factory: recording
    mapping: {}
  bad_options:
    source:
      factory: rows
      options:
        file_path: a
        color: red
    target:
      factory: recording
    mapping: {}
  bad_mapping:
    source:
      factory: rows
      options:
        file_path: a
    target:
      factory: recording
    mapping:
      title: 5
  no_mapping:
    source:
      factory: rows
      options:
        file_path: a
    target:
      factory: recording
"#;

struct Fixture {
    sources: Arc<RowsSourceFactory>,
    fixtures: Arc<RowsSourceFactory>,
    targets: Arc<RecordingTargetFactory>,
    factory: ImportServiceFactory,
}

fn fixture() -> Fixture {
    let sources = Arc::new(RowsSourceFactory::default());
    let fixtures = Arc::new(RowsSourceFactory::default());
    let targets = Arc::new(RecordingTargetFactory::default());
    let presets = PresetFactory::new(Arc::new(NoExpressions))
        .with_source_factory("rows", sources.clone())
        .with_target_factory("recording", targets.clone())
        .with_fixture_source_factory(fixtures.clone())
        .with_data_processor("drop_all", |records: RecordSet| Ok(records.filter(|_| false)));
    let factory = ImportServiceFactory::new(Config::from_yaml(YAML).unwrap(), presets);
    Fixture {
        sources,
        fixtures,
        targets,
        factory,
    }
}

fn options(value: Value) -> Options {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected an object"),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_preset_names_sorted() {
    let fx = fixture();
    assert_eq!(
        fx.factory.preset_names(),
        vec![
            "bad_mapping",
            "bad_options",
            "filtered",
            "no_mapping",
            "products",
            "unknown_source"
        ]
    );
}

#[tokio::test]
async fn test_create_wires_template_and_runs() {
    let fx = fixture();
    let service = fx.factory.create("products", None, None).unwrap();

    let summary = service.import_data(false).await.unwrap();
    assert_eq!(summary.added, 1);

    let seen = fx.targets.seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, vec!["title"]);
    assert_eq!(seen[0].1.get("table"), Some(&json!("base_table")));
    assert!(service.preset().mapper().is_some());
}

#[test]
fn test_overrides_merged_before_validation() {
    let fx = fixture();
    let source_overrides = options(json!({"file_path": "override-7"}));
    let target_overrides = options(json!({"table": "other"}));

    fx.factory
        .create("products", Some(&source_overrides), Some(&target_overrides))
        .unwrap();

    assert_eq!(
        fx.sources.seen.lock()[0].get("file_path"),
        Some(&json!("override-7"))
    );
    assert_eq!(fx.targets.seen.lock()[0].1.get("table"), Some(&json!("other")));

    let invalid = options(json!({"unexpected": true}));
    let err = fx
        .factory
        .create("products", None, Some(&invalid))
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidOptions { kind: "target", .. }));
}

#[tokio::test]
async fn test_data_processor_resolved_by_name() {
    let fx = fixture();
    let service = fx.factory.create("filtered", None, None).unwrap();

    let summary = service.import_data(false).await.unwrap();
    assert_eq!(summary.added, 0);
}

#[test]
fn test_wiring_errors() {
    let fx = fixture();

    assert!(matches!(
        fx.factory.create("missing", None, None).unwrap_err(),
        ConfigError::UnknownPreset(_)
    ));
    assert!(matches!(
        fx.factory.create("unknown_source", None, None).unwrap_err(),
        ConfigError::UnknownFactory { kind: "source", .. }
    ));

    let err = fx.factory.create("bad_options", None, None).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Failed to create data source for factory rows of preset \"bad_options\": The following option is not supported: \"color\""
    );

    assert!(matches!(
        fx.factory.create("bad_mapping", None, None).unwrap_err(),
        ConfigError::Mapping { .. }
    ));

    let err = fx.factory.create("no_mapping", None, None).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Missing \"mapping\" configuration for preset \"no_mapping\""
    );
}

#[tokio::test]
async fn test_create_with_fixture_uses_fixture_options() {
    let fx = fixture();
    let service = fx.factory.create_with_fixture("products", None).unwrap();

    assert!(fx.sources.seen.lock().is_empty());
    let seen = fx.fixtures.seen.lock().clone();
    assert_eq!(
        seen[0],
        options(json!({
            "file_path": "fixture-1",
            "id_attribute": "id",
            "version_attribute": "tstamp"
        }))
    );

    let summary = service.import_data(false).await.unwrap();
    assert_eq!(summary.added, 1);
}

#[test]
fn test_create_with_fixture_requires_fixture() {
    let fx = fixture();
    let err = fx.factory.create_with_fixture("filtered", None).unwrap_err();
    assert!(matches!(err, ConfigError::MissingFixture(_)));
}

#[tokio::test]
async fn test_create_with_source_substitutes_source() {
    let observer = RecordingObserver::new();
    let fx = fixture();
    let factory = fx.factory.with_observer(observer.clone());
    let records = RecordSet::from_records([common::record("a", None), common::record("b", None)]);

    let service = factory
        .create_with_source("products", Arc::new(StaticSource::new(records)))
        .unwrap();
    service.import_data(false).await.unwrap();

    assert!(fx.sources.seen.lock().is_empty());
    assert_eq!(observer.events()[0], "records_loaded:2");
}
