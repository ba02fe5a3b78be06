//! Import observer port
//!
//! Observers receive the lifecycle events of a reconciliation cycle. They
//! are registered when the engine is built and invoked synchronously, in
//! registration order. Every method has an empty default so observers only
//! implement the events they care about.
//!
//! Observer code runs inside the cycle: a panicking observer aborts it.

use crate::domain::{ChangeSet, IdSet, Record, RecordId, RecordSet};

/// Port trait for lifecycle notifications of the import engine
pub trait IImportObserver: Send + Sync {
    /// The source produced its records, before changes are computed
    fn records_loaded(&self, _records: &RecordSet) {}

    /// The target computed the delta, before policy validation
    fn changes_computed(&self, _changes: &ChangeSet) {}

    fn adding_started(&self, _records: &RecordSet) {}

    fn record_adding(&self, _record: &Record) {}

    fn adding_finished(&self, _records: &RecordSet) {}

    fn updating_started(&self, _records: &RecordSet, _forced: bool) {}

    fn record_updating(&self, _record: &Record) {}

    fn updating_finished(&self, _records: &RecordSet) {}

    fn removing_started(&self, _ids: &IdSet) {}

    fn record_removing(&self, _id: &RecordId) {}

    fn removing_finished(&self, _ids: &IdSet) {}

    /// A single record failed in a recoverable way
    fn error(&self, _message: &str) {}
}

/// Observer that forwards every lifecycle event to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl IImportObserver for TracingObserver {
    fn records_loaded(&self, records: &RecordSet) {
        tracing::info!(count = records.len(), "Records loaded");
    }

    fn changes_computed(&self, changes: &ChangeSet) {
        tracing::info!(
            added = changes.added().len(),
            updated = changes.updated().len(),
            removed = changes.removed_ids().len(),
            "Changes computed"
        );
    }

    fn adding_started(&self, records: &RecordSet) {
        tracing::info!(count = records.len(), "Adding records");
    }

    fn record_adding(&self, record: &Record) {
        tracing::debug!(record_id = %record.id(), "Adding record");
    }

    fn adding_finished(&self, records: &RecordSet) {
        tracing::info!(count = records.len(), "Finished adding records");
    }

    fn updating_started(&self, records: &RecordSet, forced: bool) {
        tracing::info!(count = records.len(), forced, "Updating records");
    }

    fn record_updating(&self, record: &Record) {
        tracing::debug!(record_id = %record.id(), version = %record.version(), "Updating record");
    }

    fn updating_finished(&self, records: &RecordSet) {
        tracing::info!(count = records.len(), "Finished updating records");
    }

    fn removing_started(&self, ids: &IdSet) {
        tracing::info!(count = ids.len(), "Removing records");
    }

    fn record_removing(&self, id: &RecordId) {
        tracing::debug!(record_id = %id, "Removing record");
    }

    fn removing_finished(&self, ids: &IdSet) {
        tracing::info!(count = ids.len(), "Finished removing records");
    }

    fn error(&self, message: &str) {
        tracing::warn!(%message, "Record skipped");
    }
}
