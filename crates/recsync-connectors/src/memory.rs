//! MemoryTarget - IDataTarget backed by an in-memory table
//!
//! Rows are the mapped attributes of each record, keyed by record id. When a
//! version column is configured, the record version is stored in it and read
//! back into the snapshot.
//!
//! ## Design Notes
//!
//! - Uses `parking_lot::Mutex`; no lock is held across an await point.
//! - Writes are buffered and applied every `batch_size` operations and on
//!   `finalize`, so the table only ever shows flushed state.
//! - `begin_cycle` drops the cached snapshot and anything an aborted run
//!   left buffered.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use recsync_core::domain::{Attributes, LocalSnapshot, Record, RecordId, SetupResult};
use recsync_core::ports::{ApplyResult, IDataTarget, IDataTargetFactory};
use recsync_core::{FieldMapper, OptionType, Options, OptionsSchema};

use crate::table::RowTable;
use crate::{batch_size_option, string_option, DEFAULT_BATCH_SIZE};

/// In-memory data target
#[derive(Debug)]
pub struct MemoryTarget {
    mapper: Arc<FieldMapper>,
    table: Mutex<RowTable>,
}

impl MemoryTarget {
    /// Empty table without a version column
    pub fn new(mapper: Arc<FieldMapper>) -> Self {
        Self {
            mapper,
            table: Mutex::new(RowTable::new(DEFAULT_BATCH_SIZE, None)),
        }
    }

    #[must_use]
    pub fn with_version_column(self, column: impl Into<String>) -> Self {
        self.table.lock().set_version_column(Some(column.into()));
        self
    }

    #[must_use]
    pub fn with_batch_size(self, batch_size: usize) -> Self {
        self.table.lock().set_batch_size(batch_size);
        self
    }

    /// Preload committed rows
    #[must_use]
    pub fn with_rows<I>(self, rows: I) -> Self
    where
        I: IntoIterator<Item = (RecordId, Attributes)>,
    {
        self.table.lock().replace_rows(rows.into_iter().collect());
        self
    }

    /// Committed rows
    pub fn rows(&self) -> BTreeMap<RecordId, Attributes> {
        self.table.lock().rows().clone()
    }

    /// Writes buffered since the last flush
    pub fn pending_writes(&self) -> usize {
        self.table.lock().pending_writes()
    }

    /// Number of flushes applied so far
    pub fn flush_count(&self) -> usize {
        self.table.lock().flushes()
    }

    fn flush_if(&self, due: bool) {
        if due && self.table.lock().flush() {
            debug!("Memory table batch flushed");
        }
    }
}

#[async_trait::async_trait]
impl IDataTarget for MemoryTarget {
    async fn setup(&self) -> SetupResult {
        let rows = self.table.lock().rows().len();
        SetupResult::new().with_notice(format!("In-memory table holds {} rows", rows))
    }

    async fn begin_cycle(&self) -> anyhow::Result<()> {
        let dropped = self.table.lock().begin_cycle();
        if dropped > 0 {
            warn!(dropped, "Discarded writes left unflushed by an earlier run");
        }
        Ok(())
    }

    async fn local_snapshot(&self) -> anyhow::Result<LocalSnapshot> {
        Ok(self.table.lock().snapshot()?)
    }

    async fn add_record(&self, record: &Record) -> ApplyResult {
        let due = {
            let mut table = self.table.lock();
            let row = table.row_for(&self.mapper, record)?;
            table.add(record.id(), row)?
        };
        self.flush_if(due);
        Ok(())
    }

    async fn update_record(&self, record: &Record) -> ApplyResult {
        let due = {
            let mut table = self.table.lock();
            let row = table.row_for(&self.mapper, record)?;
            table.update(record.id(), row)?
        };
        self.flush_if(due);
        Ok(())
    }

    async fn remove_record(&self, id: &RecordId) -> ApplyResult {
        let due = self.table.lock().remove(id)?;
        self.flush_if(due);
        Ok(())
    }

    async fn remove_all(&self) -> anyhow::Result<u64> {
        let removed = self.table.lock().clear();
        debug!(removed, "Memory table cleared");
        Ok(removed)
    }

    async fn finalize(&self) -> anyhow::Result<()> {
        let mut table = self.table.lock();
        table.flush();
        table.invalidate_snapshot();
        Ok(())
    }
}

/// Factory of [`MemoryTarget`]s
///
/// Options: `version_column` and `batch_size`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryTargetFactory;

impl IDataTargetFactory for MemoryTargetFactory {
    fn options_schema(&self) -> OptionsSchema {
        OptionsSchema::new()
            .has("version_column", OptionType::String)
            .has("batch_size", OptionType::Integer)
    }

    fn create(
        &self,
        mapper: Arc<FieldMapper>,
        options: &Options,
    ) -> anyhow::Result<Arc<dyn IDataTarget>> {
        let mut target = MemoryTarget::new(mapper).with_batch_size(batch_size_option(options)?);
        if let Some(column) = string_option(options, "version_column") {
            target = target.with_version_column(column);
        }
        Ok(Arc::new(target))
    }
}
