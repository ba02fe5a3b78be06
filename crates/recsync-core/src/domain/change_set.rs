//! Change set computation
//!
//! A [`ChangeSet`] is the delta between a freshly loaded candidate
//! [`RecordSet`] and the ids/versions already present in a target
//! ([`LocalSnapshot`]). [`ChangeSet::compute`] is the canonical diff every
//! target must reproduce:
//!
//! - candidate id not present locally: *added* (dropped when `skip_added`)
//! - candidate id present locally: *updated* if updates are forced, the
//!   candidate version is unset, no local version is recorded, or the
//!   candidate version is strictly higher
//! - local id not present in the candidates: *removed* (dropped when
//!   `skip_removed`)

use std::collections::HashMap;

use super::id_set::IdSet;
use super::newtypes::{RecordId, RecordVersion};
use super::record_set::RecordSet;

// ============================================================================
// ChangeOptions
// ============================================================================

/// Flags steering [`ChangeSet::compute`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeOptions {
    /// Classify every known record as updated, regardless of versions
    pub force_updates: bool,
    /// Never classify records as added
    pub skip_added: bool,
    /// Never classify records as removed
    pub skip_removed: bool,
}

impl ChangeOptions {
    #[must_use]
    pub fn with_force_updates(mut self, force_updates: bool) -> Self {
        self.force_updates = force_updates;
        self
    }

    #[must_use]
    pub fn with_skip_added(mut self, skip_added: bool) -> Self {
        self.skip_added = skip_added;
        self
    }

    #[must_use]
    pub fn with_skip_removed(mut self, skip_removed: bool) -> Self {
        self.skip_removed = skip_removed;
        self
    }
}

// ============================================================================
// LocalSnapshot
// ============================================================================

/// Ids and versions present in a target at the start of a cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalSnapshot {
    ids: IdSet,
    versions: HashMap<RecordId, RecordVersion>,
}

impl LocalSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of ids without version information
    pub fn from_ids(ids: IdSet) -> Self {
        Self {
            ids,
            versions: HashMap::new(),
        }
    }

    /// Record a local id with its version; the first entry for an id wins
    pub fn insert(&mut self, id: RecordId, version: RecordVersion) {
        if self.ids.insert(id.clone()) && !version.is_not_set() {
            self.versions.insert(id, version);
        }
    }

    /// Builder form of [`LocalSnapshot::insert`]
    #[must_use]
    pub fn with_entry(mut self, id: impl Into<RecordId>, version: RecordVersion) -> Self {
        self.insert(id.into(), version);
        self
    }

    pub fn ids(&self) -> &IdSet {
        &self.ids
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.ids.contains(id)
    }

    /// Local version of `id`; unset when none is recorded
    pub fn version(&self, id: &RecordId) -> RecordVersion {
        self.versions.get(id).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

// ============================================================================
// ChangeSet
// ============================================================================

/// Records to add, records to update and ids to remove
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    added: RecordSet,
    updated: RecordSet,
    removed_ids: IdSet,
}

impl ChangeSet {
    /// Assemble a change set from its parts
    pub fn new(added: RecordSet, updated: RecordSet, removed_ids: IdSet) -> Self {
        Self {
            added,
            updated,
            removed_ids,
        }
    }

    /// Diff `candidates` against `local`
    pub fn compute(candidates: &RecordSet, local: &LocalSnapshot, options: ChangeOptions) -> Self {
        let mut added = RecordSet::new();
        let mut updated = RecordSet::new();

        for record in candidates {
            if !local.contains(record.id()) {
                if !options.skip_added {
                    added.insert(record.clone());
                }
                continue;
            }

            let candidate = record.version();
            let needs_update = options.force_updates
                || candidate.is_not_set()
                || candidate.is_higher_than(&local.version(record.id()));
            if needs_update {
                updated.insert(record.clone());
            }
        }

        let removed_ids = if options.skip_removed {
            IdSet::new()
        } else {
            local.ids().diff(&candidates.ids())
        };

        tracing::debug!(
            candidates = candidates.len(),
            local = local.len(),
            added = added.len(),
            updated = updated.len(),
            removed = removed_ids.len(),
            "Computed change set"
        );

        Self::new(added, updated, removed_ids)
    }

    pub fn added(&self) -> &RecordSet {
        &self.added
    }

    pub fn updated(&self) -> &RecordSet {
        &self.updated
    }

    pub fn removed_ids(&self) -> &IdSet {
        &self.removed_ids
    }

    pub fn has_additions(&self) -> bool {
        !self.added.is_empty()
    }

    pub fn has_updates(&self) -> bool {
        !self.updated.is_empty()
    }

    pub fn has_removals(&self) -> bool {
        !self.removed_ids.is_empty()
    }

    /// Returns true if applying this change set would not touch the target
    pub fn is_empty(&self) -> bool {
        !self.has_additions() && !self.has_updates() && !self.has_removals()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::{Attributes, Record};

    fn candidate(id: &str, version: RecordVersion) -> Record {
        Record::with_version(id, version, Attributes::new())
    }

    fn local() -> LocalSnapshot {
        LocalSnapshot::new()
            .with_entry("1", RecordVersion::Set(10))
            .with_entry("2", RecordVersion::Set(10))
            .with_entry("3", RecordVersion::Set(10))
    }

    fn candidates() -> RecordSet {
        RecordSet::from_records([
            candidate("2", RecordVersion::Set(10)),
            candidate("3", RecordVersion::Set(20)),
            candidate("4", RecordVersion::none()),
        ])
    }

    #[test]
    fn test_compute_classifies_records() {
        let changes = ChangeSet::compute(&candidates(), &local(), ChangeOptions::default());

        assert_eq!(changes.added().ids(), IdSet::from_strings(["4"]));
        assert_eq!(changes.updated().ids(), IdSet::from_strings(["3"]));
        assert_eq!(changes.removed_ids(), &IdSet::from_strings(["1"]));
        assert!(!changes.updated().contains(&RecordId::new("2")));
    }

    #[test]
    fn test_force_updates_flags_all_known() {
        let options = ChangeOptions::default().with_force_updates(true);
        let changes = ChangeSet::compute(&candidates(), &local(), options);

        assert_eq!(changes.updated().ids(), IdSet::from_strings(["2", "3"]));
    }

    #[test]
    fn test_skip_flags_drop_classes() {
        let options = ChangeOptions::default()
            .with_skip_added(true)
            .with_skip_removed(true);
        let changes = ChangeSet::compute(&candidates(), &local(), options);

        assert!(!changes.has_additions());
        assert!(!changes.has_removals());
        assert!(changes.has_updates());
    }

    #[test]
    fn test_unset_versions_force_update() {
        let snapshot = LocalSnapshot::new()
            .with_entry("1", RecordVersion::none())
            .with_entry("2", RecordVersion::Set(5));
        let set = RecordSet::from_records([
            candidate("1", RecordVersion::Set(0)),
            candidate("2", RecordVersion::none()),
        ]);

        let changes = ChangeSet::compute(&set, &snapshot, ChangeOptions::default());
        assert_eq!(changes.updated().len(), 2);
    }

    #[test]
    fn test_empty_inputs() {
        let changes = ChangeSet::compute(&RecordSet::new(), &LocalSnapshot::new(), ChangeOptions::default());
        assert!(changes.is_empty());

        let wipe = ChangeSet::compute(&RecordSet::new(), &local(), ChangeOptions::default());
        assert_eq!(wipe.removed_ids().len(), 3);
        assert!(!wipe.has_additions());
    }
}
