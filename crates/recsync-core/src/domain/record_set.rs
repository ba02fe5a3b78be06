//! Id-keyed collection of records

use std::collections::HashMap;

use serde_json::Value;

use super::errors::DomainError;
use super::id_set::IdSet;
use super::newtypes::{type_name, RecordId, RecordVersion};
use super::record::{Attributes, Record};

/// Collection of [`Record`]s with at most one record per id
///
/// Inserting a record whose id is already present is a no-op: the first
/// insert wins. Iteration follows insertion order.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    records: Vec<Record>,
    index: HashMap<RecordId, usize>,
}

impl RecordSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from raw tabular rows
    ///
    /// Every row becomes an eager record carrying the whole row as its
    /// attributes. String ids are taken as is, numeric ids are rendered in
    /// decimal. A `null` version value yields an unset version.
    ///
    /// # Errors
    ///
    /// Fails on the first row that lacks the id attribute (or the version
    /// attribute, when one is configured) or holds an unusable value.
    pub fn from_raw_rows<I>(
        rows: I,
        id_attribute: &str,
        version_attribute: Option<&str>,
    ) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = Attributes>,
    {
        let mut set = RecordSet::new();
        for row in rows {
            let id = match row.get(id_attribute) {
                None | Some(Value::Null) => {
                    return Err(DomainError::MissingIdAttribute(id_attribute.to_string()))
                }
                Some(value) => id_from_value(id_attribute, value)?,
            };

            let version = match version_attribute {
                None => RecordVersion::none(),
                Some(attribute) => match row.get(attribute) {
                    None => return Err(DomainError::MissingVersionAttribute(attribute.to_string())),
                    Some(Value::Null) => RecordVersion::none(),
                    Some(value) => RecordVersion::parse(value)?,
                },
            };

            set.insert(Record::with_version(id, version, row));
        }
        Ok(set)
    }

    /// Build a set from pre-built records
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = Record>,
    {
        records.into_iter().collect()
    }

    /// Insert a record; returns false if its id was already present
    pub fn insert(&mut self, record: Record) -> bool {
        if self.index.contains_key(record.id()) {
            return false;
        }
        self.index.insert(record.id().clone(), self.records.len());
        self.records.push(record);
        true
    }

    /// Copy of this set including `record` (unless its id is already present)
    #[must_use]
    pub fn with_record(&self, record: Record) -> Self {
        let mut copy = self.clone();
        copy.insert(record);
        copy
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.index.get(id).map(|position| &self.records[*position])
    }

    /// All ids, in iteration order
    pub fn ids(&self) -> IdSet {
        self.records.iter().map(|record| record.id().clone()).collect()
    }

    /// Records matching `predicate`
    #[must_use]
    pub fn filter<F>(&self, mut predicate: F) -> Self
    where
        F: FnMut(&Record) -> bool,
    {
        self.records
            .iter()
            .filter(|record| predicate(*record))
            .cloned()
            .collect()
    }

    /// Transform every record; records mapped onto an existing id are dropped
    #[must_use]
    pub fn map<F>(&self, transform: F) -> Self
    where
        F: FnMut(&Record) -> Record,
    {
        self.records.iter().map(transform).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }
}

fn id_from_value(attribute: &str, value: &Value) -> Result<RecordId, DomainError> {
    match value {
        Value::String(text) => Ok(RecordId::new(text.clone())),
        Value::Number(number) => Ok(RecordId::new(number.to_string())),
        Value::Bool(true) => Ok(RecordId::new("1")),
        Value::Bool(false) => Ok(RecordId::new("")),
        other => Err(DomainError::InvalidId {
            attribute: attribute.to_string(),
            value: type_name(other).to_string(),
        }),
    }
}

impl FromIterator<Record> for RecordSet {
    fn from_iter<T: IntoIterator<Item = Record>>(iter: T) -> Self {
        let mut set = RecordSet::new();
        for record in iter {
            set.insert(record);
        }
        set
    }
}

impl IntoIterator for RecordSet {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(value: Value) -> Vec<Attributes> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_from_raw_rows() {
        let set = RecordSet::from_raw_rows(
            rows(json!([
                {"id": 1, "version": 10, "title": "a"},
                {"id": "2", "version": "2019-06-14", "title": "b"},
                {"id": 1, "version": 99, "title": "duplicate"}
            ])),
            "id",
            Some("version"),
        )
        .unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.ids(), IdSet::from_strings(["1", "2"]));

        let first = set.get(&RecordId::new("1")).unwrap();
        assert_eq!(first.version(), RecordVersion::Set(10));
        assert_eq!(first.attribute("title").unwrap(), json!("a"));
        assert_eq!(first.attribute("id").unwrap(), json!(1));
    }

    #[test]
    fn test_from_raw_rows_missing_id() {
        let err = RecordSet::from_raw_rows(
            rows(json!([{"id": "1"}, {"uid": "2"}])),
            "id",
            None,
        )
        .unwrap_err();

        assert_eq!(err, DomainError::MissingIdAttribute("id".to_string()));
        assert_eq!(
            err.to_string(),
            "the id attribute \"id\" is not part of the data source"
        );
    }

    #[test]
    fn test_from_raw_rows_missing_version() {
        let err = RecordSet::from_raw_rows(rows(json!([{"id": "1"}])), "id", Some("tstamp"))
            .unwrap_err();
        assert_eq!(err, DomainError::MissingVersionAttribute("tstamp".to_string()));
    }

    #[test]
    fn test_from_raw_rows_invalid_id() {
        let err = RecordSet::from_raw_rows(rows(json!([{"id": [1, 2]}])), "id", None)
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidId { .. }));
    }

    #[test]
    fn test_null_version_is_unset() {
        let set = RecordSet::from_raw_rows(
            rows(json!([{"id": "1", "version": null}])),
            "id",
            Some("version"),
        )
        .unwrap();
        assert!(set.get(&RecordId::new("1")).unwrap().version().is_not_set());
    }

    #[test]
    fn test_with_record_first_wins() {
        let set = RecordSet::new().with_record(Record::new("1", Attributes::new()));
        let mut replacement = Attributes::new();
        replacement.insert("title".to_string(), json!("new"));

        let same = set.with_record(Record::new("1", replacement));
        assert_eq!(same.len(), 1);
        assert!(!same
            .get(&RecordId::new("1"))
            .unwrap()
            .has_attribute("title")
            .unwrap());
    }

    #[test]
    fn test_filter_and_map() {
        let set = RecordSet::from_raw_rows(
            rows(json!([{"id": "1", "n": 1}, {"id": "2", "n": 2}, {"id": "3", "n": 3}])),
            "id",
            None,
        )
        .unwrap();

        let odd = set.filter(|record| record.attribute("n").unwrap().as_i64().unwrap() % 2 == 1);
        assert_eq!(odd.ids(), IdSet::from_strings(["1", "3"]));

        let prefixed = set.map(|record| record.with_id(format!("p-{}", record.id())));
        let ids: Vec<String> = prefixed.iter().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, vec!["p-1", "p-2", "p-3"]);

        let collapsed = set.map(|record| record.with_id("same"));
        assert_eq!(collapsed.len(), 1);
    }
}
