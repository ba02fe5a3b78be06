//! Set of record identifiers

use std::collections::HashSet;

use super::newtypes::RecordId;

/// Id-keyed set of [`RecordId`]s
///
/// Iteration follows insertion order; inserting an id twice is a no-op.
/// Equality compares membership only.
#[derive(Debug, Clone, Default)]
pub struct IdSet {
    ordered: Vec<RecordId>,
    members: HashSet<RecordId>,
}

impl IdSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from raw string identifiers
    pub fn from_strings<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ids.into_iter().map(|id| RecordId::new(id)).collect()
    }

    /// Membership test
    pub fn contains(&self, id: &RecordId) -> bool {
        self.members.contains(id)
    }

    /// Ids of `self` that are not part of `other`, in the order of `self`
    #[must_use]
    pub fn diff(&self, other: &IdSet) -> IdSet {
        self.ordered
            .iter()
            .filter(|id| !other.contains(id))
            .cloned()
            .collect()
    }

    /// Insert an id; returns false if it was already present
    pub fn insert(&mut self, id: RecordId) -> bool {
        if self.members.contains(&id) {
            return false;
        }
        self.members.insert(id.clone());
        self.ordered.push(id);
        true
    }

    /// Copy of this set including `id`
    #[must_use]
    pub fn with_id(&self, id: RecordId) -> Self {
        let mut copy = self.clone();
        copy.insert(id);
        copy
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RecordId> {
        self.ordered.iter()
    }
}

impl PartialEq for IdSet {
    fn eq(&self, other: &Self) -> bool {
        self.members == other.members
    }
}

impl Eq for IdSet {}

impl FromIterator<RecordId> for IdSet {
    fn from_iter<T: IntoIterator<Item = RecordId>>(iter: T) -> Self {
        let mut set = IdSet::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

impl Extend<RecordId> for IdSet {
    fn extend<T: IntoIterator<Item = RecordId>>(&mut self, iter: T) {
        for id in iter {
            self.insert(id);
        }
    }
}

impl IntoIterator for IdSet {
    type Item = RecordId;
    type IntoIter = std::vec::IntoIter<RecordId>;

    fn into_iter(self) -> Self::IntoIter {
        self.ordered.into_iter()
    }
}

impl<'a> IntoIterator for &'a IdSet {
    type Item = &'a RecordId;
    type IntoIter = std::slice::Iter<'a, RecordId>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
