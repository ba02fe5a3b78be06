//! Data target port (driven/secondary port)
//!
//! This module defines the interface of the local store a reconciliation
//! cycle applies its changes to, e.g. a database table or a content store.
//!
//! ## Design Notes
//!
//! - Single-record mutations return [`ApplyResult`] so the engine can tell
//!   a failure attributable to one record ([`ApplyError::Recoverable`]) from
//!   one that invalidates the whole run ([`ApplyError::Fatal`]).
//! - Implementations are expected to batch physical writes and flush the
//!   remainder in [`IDataTarget::finalize`].
//! - [`IDataTarget::compute_changes`] has a default implementation built on
//!   [`ChangeSet::compute`]; targets only provide the local snapshot.
//! - A target may outlive a run, including an aborted one. The engine calls
//!   [`IDataTarget::begin_cycle`] before every run so cached or buffered
//!   state never leaks from one run into the next.

use thiserror::Error;

use crate::domain::{
    ChangeOptions, ChangeSet, LocalSnapshot, Record, RecordError, RecordId, RecordSet,
    SetupResult,
};

// ============================================================================
// ApplyError
// ============================================================================

/// Outcome of a failed single-record mutation
#[derive(Debug, Error)]
pub enum ApplyError {
    /// The record was rejected; the run continues with the next record
    #[error("{0}")]
    Recoverable(String),

    /// The target is unusable; the run aborts
    #[error(transparent)]
    Fatal(#[from] anyhow::Error),
}

impl ApplyError {
    /// Create a recoverable error
    pub fn recoverable(reason: impl Into<String>) -> Self {
        ApplyError::Recoverable(reason.into())
    }

    /// Returns true if the run may continue after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ApplyError::Recoverable(_))
    }
}

impl From<RecordError> for ApplyError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::MissingAttribute { .. } => ApplyError::Recoverable(err.to_string()),
            RecordError::LazyLoad { .. } => ApplyError::Fatal(err.into()),
        }
    }
}

/// Result of a single-record mutation
pub type ApplyResult = Result<(), ApplyError>;

// ============================================================================
// IDataTarget
// ============================================================================

/// Port trait for the store records are synchronized into
#[async_trait::async_trait]
pub trait IDataTarget: Send + Sync {
    /// Readiness checks of the target (table exists, file writable, ...)
    ///
    /// Must not mutate anything.
    async fn setup(&self) -> SetupResult {
        SetupResult::new()
    }

    /// Reset per-run state before a cycle starts
    ///
    /// Targets drop their cached snapshot and any writes left unflushed by
    /// an aborted run, and re-read external state they keep in memory.
    async fn begin_cycle(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Ids and versions currently present in the target
    ///
    /// Called once per cycle, after [`IDataTarget::begin_cycle`].
    async fn local_snapshot(&self) -> anyhow::Result<LocalSnapshot>;

    /// Diff `candidates` against the local snapshot
    async fn compute_changes(
        &self,
        candidates: &RecordSet,
        options: ChangeOptions,
    ) -> anyhow::Result<ChangeSet> {
        let local = self.local_snapshot().await?;
        Ok(ChangeSet::compute(candidates, &local, options))
    }

    /// Insert a record that does not exist locally
    async fn add_record(&self, record: &Record) -> ApplyResult;

    /// Overwrite a record that exists locally
    async fn update_record(&self, record: &Record) -> ApplyResult;

    /// Delete a local record
    async fn remove_record(&self, id: &RecordId) -> ApplyResult;

    /// Delete every local record and return how many were removed
    async fn remove_all(&self) -> anyhow::Result<u64>;

    /// Flush pending writes; a no-op when nothing is pending
    async fn finalize(&self) -> anyhow::Result<()>;
}
