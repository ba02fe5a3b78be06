//! Import use case
//!
//! Orchestrates one reconciliation cycle of a [`Preset`]: load the source,
//! let the target compute the change set, validate the skip policies and
//! apply additions, updates and removals record by record before
//! finalizing the target.
//!
//! ## State Machine
//!
//! ```text
//!   Idle ─► Loading ─► ComputingChanges ─► ValidatingPolicy ─► Adding
//!                                                                │
//!   Done ◄─ Finalizing ◄─ Removing ◄─ Updating ◄─────────────────┘
//!
//!   any stage ──fatal error──► Failed
//! ```
//!
//! Only failures attributable to a single record are absorbed: they are
//! reported through [`IImportObserver::error`] and the record is skipped.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::domain::{ChangeSet, IdSet, RecordId, RecordSet, SetupResult};
use crate::ports::{ApplyError, ApplyResult, IImportObserver};
use crate::preset::Preset;

// ============================================================================
// ImportState
// ============================================================================

/// Stage of the current (or last) reconciliation cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportState {
    /// No cycle has run yet
    #[default]
    Idle,
    Loading,
    ComputingChanges,
    ValidatingPolicy,
    Adding,
    Updating,
    Removing,
    Finalizing,
    /// The last cycle completed
    Done,
    /// The last cycle aborted with a fatal error
    Failed,
}

impl fmt::Display for ImportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImportState::Idle => "idle",
            ImportState::Loading => "loading",
            ImportState::ComputingChanges => "computing_changes",
            ImportState::ValidatingPolicy => "validating_policy",
            ImportState::Adding => "adding",
            ImportState::Updating => "updating",
            ImportState::Removing => "removing",
            ImportState::Finalizing => "finalizing",
            ImportState::Done => "done",
            ImportState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Single-record mutation kind, used in error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Adding,
    Updating,
    Removing,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Adding => "adding",
            Operation::Updating => "updating",
            Operation::Removing => "removing",
        };
        write!(f, "{}", s)
    }
}

/// Skip policy of a preset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipPolicy {
    Added,
    Removed,
}

impl SkipPolicy {
    fn returned(self) -> &'static str {
        match self {
            SkipPolicy::Added => "new",
            SkipPolicy::Removed => "removed",
        }
    }
}

impl fmt::Display for SkipPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipPolicy::Added => write!(f, "added"),
            SkipPolicy::Removed => write!(f, "removed"),
        }
    }
}

/// Fatal failure of an import run
#[derive(Debug, Error)]
pub enum ImportError {
    /// Preset wiring contradicts the requested operation
    #[error("{0}")]
    Configuration(String),

    /// The target returned a delta the preset's skip policy forbids
    #[error("This preset is configured to skip {policy} records, but the data target returned {count} {} records. Check your configuration and consider executing migrations", .policy.returned())]
    PolicyViolation { policy: SkipPolicy, count: usize },

    #[error("Failed to load records from the data source")]
    Load(#[source] anyhow::Error),

    #[error("Failed to compute changes")]
    ComputeChanges(#[source] anyhow::Error),

    /// A single-record mutation failed in a way that invalidates the run
    #[error("Exception while {operation} record {id}")]
    Apply {
        operation: Operation,
        id: RecordId,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to finalize the data target")]
    Finalize(#[source] anyhow::Error),

    #[error("Exception while removing all local records")]
    RemoveAll(#[source] anyhow::Error),
}

impl ImportError {
    /// Returns true for configuration-class failures (wiring and policy)
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ImportError::Configuration(_) | ImportError::PolicyViolation { .. }
        )
    }

    /// Returns true if a single-record mutation aborted the run
    pub fn is_fatal_apply(&self) -> bool {
        matches!(self, ImportError::Apply { .. })
    }
}

// ============================================================================
// ImportSummary
// ============================================================================

/// Outcome of a completed import run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Records added
    pub added: usize,
    /// Records updated
    pub updated: usize,
    /// Records removed
    pub removed: usize,
    /// Messages of records skipped due to recoverable errors
    pub errors: Vec<String>,
    /// Whether updates were forced
    pub forced: bool,
    /// Wall-clock duration of the run
    pub duration_ms: u64,
}

impl ImportSummary {
    fn new(forced: bool) -> Self {
        Self {
            forced,
            ..Self::default()
        }
    }

    /// Returns true if the run did not touch the target
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.updated == 0 && self.removed == 0 && self.errors.is_empty()
    }
}

// ============================================================================
// ImportService
// ============================================================================

/// Reconciliation engine of one preset
pub struct ImportService {
    preset: Preset,
    observers: Vec<Arc<dyn IImportObserver>>,
    state: RwLock<ImportState>,
}

impl ImportService {
    /// Creates a new ImportService for the given preset
    pub fn new(preset: Preset) -> Self {
        Self {
            preset,
            observers: Vec::new(),
            state: RwLock::new(ImportState::Idle),
        }
    }

    /// Register an observer; observers are notified in registration order
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn IImportObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn preset(&self) -> &Preset {
        &self.preset
    }

    /// Stage of the current or last run
    pub fn state(&self) -> ImportState {
        *self.state.read()
    }

    /// Aggregated readiness checks of source and target
    pub async fn setup(&self) -> SetupResult {
        let mut result = self.preset.source_setup().await;
        result.merge(self.preset.target_setup().await);
        debug!(
            errors = result.errors().len(),
            warnings = result.warnings().len(),
            "Setup checks completed"
        );
        result
    }

    /// Run one reconciliation cycle
    ///
    /// # Arguments
    ///
    /// * `force_updates` - Update every known record regardless of versions
    ///
    /// # Errors
    ///
    /// Returns an [`ImportError`] for every failure that is not attributable
    /// to a single record. Records skipped due to recoverable errors are
    /// listed in [`ImportSummary::errors`].
    #[tracing::instrument(skip(self), fields(
        skip_added = self.preset.skip_added_records(),
        skip_removed = self.preset.skip_removed_records(),
    ))]
    pub async fn import_data(&self, force_updates: bool) -> Result<ImportSummary, ImportError> {
        let started = Instant::now();
        info!("Starting import");

        match self.run(force_updates, started).await {
            Ok(summary) => {
                self.transition(ImportState::Done);
                info!(
                    added = summary.added,
                    updated = summary.updated,
                    removed = summary.removed,
                    skipped = summary.errors.len(),
                    duration_ms = summary.duration_ms,
                    "Import finished"
                );
                Ok(summary)
            }
            Err(err) => {
                let stage = self.state();
                self.transition(ImportState::Failed);
                error!(%stage, error = %SourceChain(&err), "Import failed");
                Err(err)
            }
        }
    }

    /// Remove every local record of the target, bypassing the diff
    ///
    /// # Errors
    ///
    /// Refuses with a configuration error when a skip policy is set, since
    /// a full wipe contradicts both of them.
    #[tracing::instrument(skip(self))]
    pub async fn remove_all_data(&self) -> Result<u64, ImportError> {
        if self.preset.skip_added_records() || self.preset.skip_removed_records() {
            return Err(ImportError::Configuration(
                "This preset is configured to skip added/removed records, so no local records must be removed."
                    .to_string(),
            ));
        }
        self.preset
            .begin_cycle()
            .await
            .map_err(ImportError::RemoveAll)?;
        let removed = self
            .preset
            .remove_all()
            .await
            .map_err(ImportError::RemoveAll)?;
        info!(removed, "Removed all local records");
        Ok(removed)
    }

    async fn run(&self, force_updates: bool, started: Instant) -> Result<ImportSummary, ImportError> {
        self.transition(ImportState::Loading);
        let records = self.preset.load().await.map_err(ImportError::Load)?;
        self.notify(|observer| observer.records_loaded(&records));

        self.transition(ImportState::ComputingChanges);
        self.preset
            .begin_cycle()
            .await
            .map_err(ImportError::ComputeChanges)?;
        let changes = self
            .preset
            .compute_changes(&records, force_updates)
            .await
            .map_err(ImportError::ComputeChanges)?;
        self.notify(|observer| observer.changes_computed(&changes));

        self.transition(ImportState::ValidatingPolicy);
        self.validate_policy(&changes)?;

        let mut summary = ImportSummary::new(force_updates);

        self.transition(ImportState::Adding);
        self.add_records(changes.added(), &mut summary).await?;

        self.transition(ImportState::Updating);
        self.update_records(changes.updated(), force_updates, &mut summary)
            .await?;

        self.transition(ImportState::Removing);
        self.remove_records(changes.removed_ids(), &mut summary)
            .await?;

        self.transition(ImportState::Finalizing);
        self.preset.finalize().await.map_err(ImportError::Finalize)?;

        summary.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        Ok(summary)
    }

    fn validate_policy(&self, changes: &ChangeSet) -> Result<(), ImportError> {
        if self.preset.skip_added_records() && changes.has_additions() {
            return Err(ImportError::PolicyViolation {
                policy: SkipPolicy::Added,
                count: changes.added().len(),
            });
        }
        if self.preset.skip_removed_records() && changes.has_removals() {
            return Err(ImportError::PolicyViolation {
                policy: SkipPolicy::Removed,
                count: changes.removed_ids().len(),
            });
        }
        Ok(())
    }

    async fn add_records(&self, records: &RecordSet, summary: &mut ImportSummary) -> Result<(), ImportError> {
        if records.is_empty() {
            return Ok(());
        }
        self.notify(|observer| observer.adding_started(records));
        for record in records {
            self.notify(|observer| observer.record_adding(record));
            let outcome = self.preset.add_record(record).await;
            if self.handle_outcome(Operation::Adding, record.id(), outcome, summary)? {
                summary.added += 1;
            }
        }
        self.notify(|observer| observer.adding_finished(records));
        Ok(())
    }

    async fn update_records(
        &self,
        records: &RecordSet,
        forced: bool,
        summary: &mut ImportSummary,
    ) -> Result<(), ImportError> {
        if records.is_empty() {
            return Ok(());
        }
        self.notify(|observer| observer.updating_started(records, forced));
        for record in records {
            self.notify(|observer| observer.record_updating(record));
            let outcome = self.preset.update_record(record).await;
            if self.handle_outcome(Operation::Updating, record.id(), outcome, summary)? {
                summary.updated += 1;
            }
        }
        self.notify(|observer| observer.updating_finished(records));
        Ok(())
    }

    async fn remove_records(&self, ids: &IdSet, summary: &mut ImportSummary) -> Result<(), ImportError> {
        if ids.is_empty() {
            return Ok(());
        }
        self.notify(|observer| observer.removing_started(ids));
        for id in ids {
            self.notify(|observer| observer.record_removing(id));
            let outcome = self.preset.remove_record(id).await;
            if self.handle_outcome(Operation::Removing, id, outcome, summary)? {
                summary.removed += 1;
            }
        }
        self.notify(|observer| observer.removing_finished(ids));
        Ok(())
    }

    /// Returns Ok(true) if the mutation was applied, Ok(false) if the record was skipped
    fn handle_outcome(
        &self,
        operation: Operation,
        id: &RecordId,
        outcome: ApplyResult,
        summary: &mut ImportSummary,
    ) -> Result<bool, ImportError> {
        match outcome {
            Ok(()) => Ok(true),
            Err(ApplyError::Recoverable(reason)) => {
                let message = format!("Error while {} record \"{}\": {}", operation, id, reason);
                warn!(record_id = %id, %operation, %reason, "Skipping record");
                self.notify(|observer| observer.error(&message));
                summary.errors.push(message);
                Ok(false)
            }
            Err(ApplyError::Fatal(source)) => Err(ImportError::Apply {
                operation,
                id: id.clone(),
                source,
            }),
        }
    }

    fn notify<F>(&self, event: F)
    where
        F: Fn(&dyn IImportObserver),
    {
        for observer in &self.observers {
            event(observer.as_ref());
        }
    }

    fn transition(&self, next: ImportState) {
        let mut state = self.state.write();
        debug!(from = %*state, to = %next, "Import state transition");
        *state = next;
    }
}

impl fmt::Debug for ImportService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportService")
            .field("preset", &self.preset)
            .field("observers", &self.observers.len())
            .field("state", &self.state())
            .finish()
    }
}

/// Renders an error with its full source chain
struct SourceChain<'a>(&'a ImportError);

impl fmt::Display for SourceChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = std::error::Error::source(self.0);
        while let Some(cause) = source {
            write!(f, ": {}", cause)?;
            source = cause.source();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_violation_message() {
        let err = ImportError::PolicyViolation {
            policy: SkipPolicy::Added,
            count: 2,
        };
        assert_eq!(
            err.to_string(),
            "This preset is configured to skip added records, but the data target returned 2 new records. Check your configuration and consider executing migrations"
        );
        assert!(err.is_configuration());
        assert!(!err.is_fatal_apply());
    }

    #[test]
    fn test_apply_error_chain() {
        let err = ImportError::Apply {
            operation: Operation::Updating,
            id: RecordId::new("9"),
            source: anyhow::anyhow!("connection lost"),
        };
        assert!(err.is_fatal_apply());
        assert_eq!(
            SourceChain(&err).to_string(),
            "Exception while updating record 9: connection lost"
        );
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ImportState::ComputingChanges.to_string(), "computing_changes");
        assert_eq!(ImportState::default(), ImportState::Idle);
    }
}
