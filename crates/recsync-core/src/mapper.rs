//! Field mapper
//!
//! Maps a [`Record`] to the flat attribute map a target writes, following a
//! table of `target field -> rule` entries. A rule is either the name of a
//! source attribute (a missing attribute maps to `null`) or an expression
//! handed to the configured [`IExpressionEvaluator`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::domain::newtypes::type_name;
use crate::domain::{Attributes, Record, RecordError};
use crate::ports::{ApplyError, IExpressionEvaluator};

/// Errors that can occur while building a mapper or mapping a record
#[derive(Debug, Error)]
pub enum MappingError {
    /// A mapping rule is not a string
    #[error("Mapping rules have to be strings, got {found} for mapping \"{field}\"")]
    InvalidRule {
        /// Target field the rule belongs to
        field: String,
        /// Type of the offending rule
        found: String,
    },

    /// Reading the record failed
    #[error(transparent)]
    Record(#[from] RecordError),

    /// An expression rule failed to evaluate
    #[error("The following expression could not be evaluated: {expression}")]
    Expression {
        /// The expression text
        expression: String,
        /// Evaluator failure
        #[source]
        source: anyhow::Error,
    },
}

impl From<MappingError> for ApplyError {
    fn from(err: MappingError) -> Self {
        match err {
            MappingError::Record(record) => record.into(),
            MappingError::Expression { .. } => ApplyError::Recoverable(format!("{:#}", anyhow::Error::from(err))),
            MappingError::InvalidRule { .. } => ApplyError::Fatal(err.into()),
        }
    }
}

/// Maps records to target attribute maps
#[derive(Clone)]
pub struct FieldMapper {
    rules: BTreeMap<String, String>,
    evaluator: Arc<dyn IExpressionEvaluator>,
}

impl FieldMapper {
    /// Create a mapper from string rules
    pub fn new(rules: BTreeMap<String, String>, evaluator: Arc<dyn IExpressionEvaluator>) -> Self {
        Self { rules, evaluator }
    }

    /// Create a mapper from a raw configuration map
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::InvalidRule`] if any rule is not a string.
    pub fn from_config(
        mapping: &serde_json::Map<String, Value>,
        evaluator: Arc<dyn IExpressionEvaluator>,
    ) -> Result<Self, MappingError> {
        let mut rules = BTreeMap::new();
        for (field, rule) in mapping {
            match rule {
                Value::String(text) => {
                    rules.insert(field.clone(), text.clone());
                }
                other => {
                    return Err(MappingError::InvalidRule {
                        field: field.clone(),
                        found: type_name(other).to_string(),
                    })
                }
            }
        }
        Ok(Self::new(rules, evaluator))
    }

    /// Target field names, sorted by name
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn rules(&self) -> &BTreeMap<String, String> {
        &self.rules
    }

    /// Map `record` to one value per target field
    ///
    /// Expression rules see the `extra` variables plus a `record` variable
    /// holding the record's attributes; `id` and `version` are added to it
    /// unless the record has attributes of those names.
    pub fn map_record(&self, record: &Record, extra: &Attributes) -> Result<Attributes, MappingError> {
        let attributes = record.attributes()?;
        let mut mapped = Attributes::new();
        let mut variables: Option<Attributes> = None;

        for (field, rule) in &self.rules {
            let value = if self.evaluator.is_expression(rule) {
                let scope = variables.get_or_insert_with(|| expression_scope(record, &attributes, extra));
                self.evaluator
                    .evaluate(rule, scope)
                    .map_err(|source| MappingError::Expression {
                        expression: rule.clone(),
                        source,
                    })?
            } else {
                attributes.get(rule).cloned().unwrap_or(Value::Null)
            };
            mapped.insert(field.clone(), value);
        }
        Ok(mapped)
    }
}

fn expression_scope(record: &Record, attributes: &Attributes, extra: &Attributes) -> Attributes {
    let mut record_variable = attributes.clone();
    record_variable
        .entry("id")
        .or_insert_with(|| Value::String(record.id().to_string()));
    record_variable
        .entry("version")
        .or_insert_with(|| record.version().value().map_or(Value::Null, Value::from));

    let mut scope = extra.clone();
    scope.insert("record".to_string(), Value::Object(record_variable));
    scope
}

impl fmt::Debug for FieldMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldMapper")
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}
