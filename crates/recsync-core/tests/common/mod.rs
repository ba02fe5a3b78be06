//! Shared test doubles for recsync-core integration tests

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use recsync_core::domain::{
    Attributes, ChangeOptions, ChangeSet, IdSet, LocalSnapshot, Record, RecordId, RecordSet,
    RecordVersion, SetupResult,
};
use recsync_core::ports::{ApplyError, ApplyResult, IDataSource, IDataTarget, IImportObserver};

// ============================================================================
// Helpers
// ============================================================================

pub fn attrs(value: Value) -> Attributes {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

pub fn record(id: &str, version: Option<u64>) -> Record {
    let version = version.map_or(RecordVersion::none(), RecordVersion::Set);
    let mut attributes = Attributes::new();
    attributes.insert("id".to_string(), Value::String(id.to_string()));
    Record::with_version(id, version, attributes)
}

// ============================================================================
// Sources
// ============================================================================

/// Source returning a fixed record set
pub struct StaticSource {
    records: RecordSet,
    setup: SetupResult,
}

impl StaticSource {
    pub fn new(records: RecordSet) -> Self {
        Self {
            records,
            setup: SetupResult::new(),
        }
    }

    pub fn with_setup(mut self, setup: SetupResult) -> Self {
        self.setup = setup;
        self
    }
}

#[async_trait::async_trait]
impl IDataSource for StaticSource {
    async fn setup(&self) -> SetupResult {
        self.setup.clone()
    }

    async fn load(&self) -> anyhow::Result<RecordSet> {
        Ok(self.records.clone())
    }
}

/// Source whose load always fails
pub struct FailingSource;

#[async_trait::async_trait]
impl IDataSource for FailingSource {
    async fn load(&self) -> anyhow::Result<RecordSet> {
        Err(anyhow::anyhow!("endpoint unreachable"))
    }
}

// ============================================================================
// RecordingTarget
// ============================================================================

/// Target recording every call it receives
#[derive(Default)]
pub struct RecordingTarget {
    snapshot: LocalSnapshot,
    recoverable: HashSet<String>,
    fatal: HashSet<String>,
    ignore_skip_flags: bool,
    setup: SetupResult,
    calls: Mutex<Vec<String>>,
}

impl RecordingTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_local(mut self, id: &str, version: Option<u64>) -> Self {
        let version = version.map_or(RecordVersion::none(), RecordVersion::Set);
        self.snapshot.insert(RecordId::new(id), version);
        self
    }

    /// Mutations of `id` fail with a recoverable error
    pub fn rejecting(mut self, id: &str) -> Self {
        self.recoverable.insert(id.to_string());
        self
    }

    /// Mutations of `id` fail with a fatal error
    pub fn failing_on(mut self, id: &str) -> Self {
        self.fatal.insert(id.to_string());
        self
    }

    /// Compute changes as if no skip policy was set
    pub fn ignoring_skip_flags(mut self) -> Self {
        self.ignore_skip_flags = true;
        self
    }

    pub fn with_setup(mut self, setup: SetupResult) -> Self {
        self.setup = setup;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call != "snapshot" && call != "begin_cycle")
            .collect()
    }

    fn apply(&self, operation: &str, id: &RecordId) -> ApplyResult {
        self.calls.lock().push(format!("{}:{}", operation, id));
        if self.recoverable.contains(id.as_str()) {
            return Err(ApplyError::recoverable("rejected by validation"));
        }
        if self.fatal.contains(id.as_str()) {
            return Err(ApplyError::Fatal(anyhow::anyhow!("connection lost")));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl IDataTarget for RecordingTarget {
    async fn setup(&self) -> SetupResult {
        self.setup.clone()
    }

    async fn begin_cycle(&self) -> anyhow::Result<()> {
        self.calls.lock().push("begin_cycle".to_string());
        Ok(())
    }

    async fn local_snapshot(&self) -> anyhow::Result<LocalSnapshot> {
        self.calls.lock().push("snapshot".to_string());
        Ok(self.snapshot.clone())
    }

    async fn compute_changes(
        &self,
        candidates: &RecordSet,
        options: ChangeOptions,
    ) -> anyhow::Result<ChangeSet> {
        let options = if self.ignore_skip_flags {
            options.with_skip_added(false).with_skip_removed(false)
        } else {
            options
        };
        let local = self.local_snapshot().await?;
        Ok(ChangeSet::compute(candidates, &local, options))
    }

    async fn add_record(&self, record: &Record) -> ApplyResult {
        record.attributes()?;
        self.apply("add", record.id())
    }

    async fn update_record(&self, record: &Record) -> ApplyResult {
        record.attributes()?;
        self.apply("update", record.id())
    }

    async fn remove_record(&self, id: &RecordId) -> ApplyResult {
        self.apply("remove", id)
    }

    async fn remove_all(&self) -> anyhow::Result<u64> {
        self.calls.lock().push("remove_all".to_string());
        Ok(self.snapshot.len() as u64)
    }

    async fn finalize(&self) -> anyhow::Result<()> {
        self.calls.lock().push("finalize".to_string());
        Ok(())
    }
}

// ============================================================================
// RecordingObserver
// ============================================================================

/// Observer recording every event as a string
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| event.strip_prefix("error:").map(str::to_string))
            .collect()
    }

    fn push(&self, event: String) {
        self.events.lock().push(event);
    }
}

impl IImportObserver for RecordingObserver {
    fn records_loaded(&self, records: &RecordSet) {
        self.push(format!("records_loaded:{}", records.len()));
    }

    fn changes_computed(&self, changes: &ChangeSet) {
        self.push(format!(
            "changes_computed:{}/{}/{}",
            changes.added().len(),
            changes.updated().len(),
            changes.removed_ids().len()
        ));
    }

    fn adding_started(&self, records: &RecordSet) {
        self.push(format!("adding_started:{}", records.len()));
    }

    fn record_adding(&self, record: &Record) {
        self.push(format!("record_adding:{}", record.id()));
    }

    fn adding_finished(&self, _records: &RecordSet) {
        self.push("adding_finished".to_string());
    }

    fn updating_started(&self, records: &RecordSet, forced: bool) {
        self.push(format!("updating_started:{}:{}", records.len(), forced));
    }

    fn record_updating(&self, record: &Record) {
        self.push(format!("record_updating:{}", record.id()));
    }

    fn updating_finished(&self, _records: &RecordSet) {
        self.push("updating_finished".to_string());
    }

    fn removing_started(&self, ids: &IdSet) {
        self.push(format!("removing_started:{}", ids.len()));
    }

    fn record_removing(&self, id: &RecordId) {
        self.push(format!("record_removing:{}", id));
    }

    fn removing_finished(&self, _ids: &IdSet) {
        self.push("removing_finished".to_string());
    }

    fn error(&self, message: &str) {
        self.push(format!("error:{}", message));
    }
}
