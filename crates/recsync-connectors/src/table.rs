//! Buffered row table shared by the reference targets
//!
//! Writes are staged in a pending buffer and become visible to the
//! snapshot only once flushed. The snapshot is cached until it is
//! invalidated by the owning target.

use std::collections::BTreeMap;

use serde_json::Value;

use recsync_core::domain::{Attributes, DomainError, LocalSnapshot, Record, RecordId, RecordVersion};
use recsync_core::ports::ApplyError;
use recsync_core::FieldMapper;

#[derive(Debug)]
pub(crate) struct RowTable {
    rows: BTreeMap<RecordId, Attributes>,
    /// `None` marks a staged removal
    pending: BTreeMap<RecordId, Option<Attributes>>,
    pending_writes: usize,
    batch_size: usize,
    version_column: Option<String>,
    snapshot: Option<LocalSnapshot>,
    flushes: usize,
}

impl RowTable {
    pub(crate) fn new(batch_size: usize, version_column: Option<String>) -> Self {
        Self {
            rows: BTreeMap::new(),
            pending: BTreeMap::new(),
            pending_writes: 0,
            batch_size: batch_size.max(1),
            version_column,
            snapshot: None,
            flushes: 0,
        }
    }

    pub(crate) fn set_batch_size(&mut self, batch_size: usize) {
        self.batch_size = batch_size.max(1);
    }

    pub(crate) fn set_version_column(&mut self, column: Option<String>) {
        self.version_column = column;
        self.snapshot = None;
    }

    pub(crate) fn version_column(&self) -> Option<&str> {
        self.version_column.as_deref()
    }

    /// Replace the committed rows, dropping anything pending
    pub(crate) fn replace_rows(&mut self, rows: BTreeMap<RecordId, Attributes>) {
        self.rows = rows;
        self.pending.clear();
        self.pending_writes = 0;
        self.snapshot = None;
    }

    pub(crate) fn rows(&self) -> &BTreeMap<RecordId, Attributes> {
        &self.rows
    }

    pub(crate) fn pending_writes(&self) -> usize {
        self.pending_writes
    }

    pub(crate) fn flushes(&self) -> usize {
        self.flushes
    }

    /// Snapshot of the committed rows, cached until invalidated
    pub(crate) fn snapshot(&mut self) -> Result<LocalSnapshot, DomainError> {
        if let Some(snapshot) = &self.snapshot {
            return Ok(snapshot.clone());
        }

        let mut snapshot = LocalSnapshot::new();
        for (id, row) in &self.rows {
            let version = match self.version_column.as_deref().and_then(|c| row.get(c)) {
                None | Some(Value::Null) => RecordVersion::none(),
                Some(value) => RecordVersion::parse(value)?,
            };
            snapshot.insert(id.clone(), version);
        }
        self.snapshot = Some(snapshot.clone());
        Ok(snapshot)
    }

    pub(crate) fn invalidate_snapshot(&mut self) {
        self.snapshot = None;
    }

    /// Forget the cached snapshot and drop writes left unflushed by an
    /// earlier run; returns the number of writes dropped
    pub(crate) fn begin_cycle(&mut self) -> usize {
        let dropped = self.pending_writes;
        self.pending.clear();
        self.pending_writes = 0;
        self.snapshot = None;
        dropped
    }

    /// Map `record` to the row stored for it
    pub(crate) fn row_for(&self, mapper: &FieldMapper, record: &Record) -> Result<Attributes, ApplyError> {
        let mut row = mapper.map_record(record, &Attributes::new())?;
        if let Some(column) = &self.version_column {
            let version = record.version().value().map_or(Value::Null, Value::from);
            row.insert(column.clone(), version);
        }
        Ok(row)
    }

    fn exists(&self, id: &RecordId) -> bool {
        match self.pending.get(id) {
            Some(staged) => staged.is_some(),
            None => self.rows.contains_key(id),
        }
    }

    /// Stage an insert; returns true when a flush is due
    pub(crate) fn add(&mut self, id: &RecordId, row: Attributes) -> Result<bool, ApplyError> {
        if self.exists(id) {
            return Err(ApplyError::recoverable(format!("Record {} already exists", id)));
        }
        Ok(self.stage(id, Some(row)))
    }

    /// Stage an update; returns true when a flush is due
    pub(crate) fn update(&mut self, id: &RecordId, row: Attributes) -> Result<bool, ApplyError> {
        if !self.exists(id) {
            return Err(ApplyError::recoverable(format!("Record {} does not exist", id)));
        }
        Ok(self.stage(id, Some(row)))
    }

    /// Stage a removal; returns true when a flush is due
    pub(crate) fn remove(&mut self, id: &RecordId) -> Result<bool, ApplyError> {
        if !self.exists(id) {
            return Err(ApplyError::recoverable(format!("Record {} does not exist", id)));
        }
        Ok(self.stage(id, None))
    }

    fn stage(&mut self, id: &RecordId, row: Option<Attributes>) -> bool {
        self.pending.insert(id.clone(), row);
        self.pending_writes += 1;
        self.pending_writes >= self.batch_size
    }

    /// Apply pending writes; returns false if nothing was pending
    pub(crate) fn flush(&mut self) -> bool {
        if self.pending.is_empty() {
            return false;
        }
        for (id, row) in std::mem::take(&mut self.pending) {
            match row {
                Some(row) => {
                    self.rows.insert(id, row);
                }
                None => {
                    self.rows.remove(&id);
                }
            }
        }
        self.pending_writes = 0;
        self.flushes += 1;
        true
    }

    /// Drop every row, committed or pending; returns the number of rows removed
    pub(crate) fn clear(&mut self) -> u64 {
        let ids: std::collections::BTreeSet<&RecordId> = self
            .rows
            .keys()
            .chain(self.pending.keys())
            .collect();
        let count = ids.into_iter().filter(|id| self.exists(id)).count() as u64;

        self.rows.clear();
        self.pending.clear();
        self.pending_writes = 0;
        self.snapshot = None;
        count
    }

    /// Committed rows as a JSON object keyed by id
    pub(crate) fn to_json(&self) -> Value {
        let rows = self
            .rows
            .iter()
            .map(|(id, row)| (id.to_string(), Value::Object(row.clone())))
            .collect();
        Value::Object(rows)
    }
}
