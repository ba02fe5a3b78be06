//! Preset wiring
//!
//! A [`Preset`] binds one source, one target and the policy options of a
//! recurring import. It is built once per run (usually from configuration
//! by the preset factory) and is immutable afterwards; the only derived
//! copy is [`Preset::with_source`], used to run a preset against fixtures.

use std::fmt;
use std::sync::Arc;

use anyhow::Context;

use crate::domain::{ChangeOptions, ChangeSet, Record, RecordId, RecordSet, SetupResult};
use crate::mapper::FieldMapper;
use crate::ports::{ApplyResult, IDataSource, IDataTarget};

/// Post-load transform applied to the records of a source
pub type DataProcessor = Arc<dyn Fn(RecordSet) -> anyhow::Result<RecordSet> + Send + Sync>;

/// Policy options of a preset
#[derive(Clone, Default)]
pub struct PresetOptions {
    /// The target must never receive new records
    pub skip_added_records: bool,
    /// The target must never lose records
    pub skip_removed_records: bool,
    /// Transform applied to loaded records before changes are computed
    pub data_processor: Option<DataProcessor>,
}

impl PresetOptions {
    #[must_use]
    pub fn with_skip_added_records(mut self, skip: bool) -> Self {
        self.skip_added_records = skip;
        self
    }

    #[must_use]
    pub fn with_skip_removed_records(mut self, skip: bool) -> Self {
        self.skip_removed_records = skip;
        self
    }

    #[must_use]
    pub fn with_data_processor<F>(mut self, processor: F) -> Self
    where
        F: Fn(RecordSet) -> anyhow::Result<RecordSet> + Send + Sync + 'static,
    {
        self.data_processor = Some(Arc::new(processor));
        self
    }
}

impl fmt::Debug for PresetOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresetOptions")
            .field("skip_added_records", &self.skip_added_records)
            .field("skip_removed_records", &self.skip_removed_records)
            .field("data_processor", &self.data_processor.is_some())
            .finish()
    }
}

/// One source, one target and the options of an import
#[derive(Clone)]
pub struct Preset {
    source: Arc<dyn IDataSource>,
    target: Arc<dyn IDataTarget>,
    mapper: Option<Arc<FieldMapper>>,
    options: PresetOptions,
}

impl Preset {
    pub fn new(source: Arc<dyn IDataSource>, target: Arc<dyn IDataTarget>) -> Self {
        Self {
            source,
            target,
            mapper: None,
            options: PresetOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: PresetOptions) -> Self {
        self.options = options;
        self
    }

    /// Attach the mapper the target was built with
    #[must_use]
    pub fn with_mapper(mut self, mapper: Arc<FieldMapper>) -> Self {
        self.mapper = Some(mapper);
        self
    }

    /// Copy of this preset reading from another source
    #[must_use]
    pub fn with_source(&self, source: Arc<dyn IDataSource>) -> Self {
        Self {
            source,
            target: Arc::clone(&self.target),
            mapper: self.mapper.clone(),
            options: self.options.clone(),
        }
    }

    pub fn source(&self) -> &Arc<dyn IDataSource> {
        &self.source
    }

    pub fn target(&self) -> &Arc<dyn IDataTarget> {
        &self.target
    }

    pub fn mapper(&self) -> Option<&Arc<FieldMapper>> {
        self.mapper.as_ref()
    }

    pub fn options(&self) -> &PresetOptions {
        &self.options
    }

    pub fn skip_added_records(&self) -> bool {
        self.options.skip_added_records
    }

    pub fn skip_removed_records(&self) -> bool {
        self.options.skip_removed_records
    }

    /// Load the source and apply the data processor, if any
    pub async fn load(&self) -> anyhow::Result<RecordSet> {
        let records = self.source.load().await?;
        match &self.options.data_processor {
            Some(processor) => processor(records).context("Data processor failed"),
            None => Ok(records),
        }
    }

    /// Let the target diff `records` using this preset's policy flags
    pub async fn compute_changes(
        &self,
        records: &RecordSet,
        force_updates: bool,
    ) -> anyhow::Result<ChangeSet> {
        let options = ChangeOptions::default()
            .with_force_updates(force_updates)
            .with_skip_added(self.options.skip_added_records)
            .with_skip_removed(self.options.skip_removed_records);
        self.target.compute_changes(records, options).await
    }

    pub async fn source_setup(&self) -> SetupResult {
        self.source.setup().await
    }

    pub async fn target_setup(&self) -> SetupResult {
        self.target.setup().await
    }

    pub async fn add_record(&self, record: &Record) -> ApplyResult {
        self.target.add_record(record).await
    }

    pub async fn update_record(&self, record: &Record) -> ApplyResult {
        self.target.update_record(record).await
    }

    pub async fn remove_record(&self, id: &RecordId) -> ApplyResult {
        self.target.remove_record(id).await
    }

    pub async fn begin_cycle(&self) -> anyhow::Result<()> {
        self.target.begin_cycle().await
    }

    pub async fn remove_all(&self) -> anyhow::Result<u64> {
        self.target.remove_all().await
    }

    pub async fn finalize(&self) -> anyhow::Result<()> {
        self.target.finalize().await
    }
}

impl fmt::Debug for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Preset")
            .field("mapper", &self.mapper)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
