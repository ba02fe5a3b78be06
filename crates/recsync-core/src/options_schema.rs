//! Options schema validation
//!
//! Connector factories describe the options they accept with an
//! [`OptionsSchema`]; the preset factory validates configured options
//! against it before the factory is invoked.
//!
//! ```
//! use recsync_core::options_schema::{OptionType, OptionsSchema};
//! use serde_json::json;
//!
//! let schema = OptionsSchema::new()
//!     .requires("file_path", OptionType::String)
//!     .has("batch_size", OptionType::Integer);
//!
//! let options = json!({"file_path": "/tmp/out.json"});
//! assert!(schema.validate(options.as_object().unwrap()).is_ok());
//! ```

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::domain::newtypes::type_name;

/// Free-form connector options
pub type Options = serde_json::Map<String, Value>;

/// Expected type of an option value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionType {
    String,
    Boolean,
    Integer,
    Number,
    Array,
    Object,
}

impl OptionType {
    fn matches(self, value: &Value) -> bool {
        match self {
            OptionType::String => value.is_string(),
            OptionType::Boolean => value.is_boolean(),
            OptionType::Integer => value.is_i64() || value.is_u64(),
            OptionType::Number => value.is_number(),
            OptionType::Array => value.is_array(),
            OptionType::Object => value.is_object(),
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OptionType::String => "string",
            OptionType::Boolean => "boolean",
            OptionType::Integer => "integer",
            OptionType::Number => "number",
            OptionType::Array => "array",
            OptionType::Object => "object",
        };
        write!(f, "{}", s)
    }
}

/// Errors raised when options do not adhere to a schema
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OptionsError {
    #[error("Missing required option \"{0}\"")]
    MissingRequired(String),

    #[error("Option \"{option}\" must be of type {expected} but it is a {actual}")]
    WrongType {
        option: String,
        expected: OptionType,
        actual: String,
    },

    #[error("{}", unsupported_message(.0))]
    Unsupported(Vec<String>),
}

fn unsupported_message(options: &[String]) -> String {
    let noun = if options.len() == 1 {
        "option is"
    } else {
        "options are"
    };
    format!("The following {} not supported: \"{}\"", noun, options.join("\", \""))
}

#[derive(Debug, Clone)]
struct OptionRule {
    name: String,
    required: bool,
    option_type: OptionType,
}

/// Declarative description of accepted options
///
/// Options that are `null` count as absent. Unknown options are rejected
/// unless [`OptionsSchema::allow_additional_options`] was called.
#[derive(Debug, Clone, Default)]
pub struct OptionsSchema {
    rules: Vec<OptionRule>,
    allow_additional: bool,
}

impl OptionsSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required option
    #[must_use]
    pub fn requires(self, name: impl Into<String>, option_type: OptionType) -> Self {
        self.with_rule(name.into(), true, option_type)
    }

    /// Add an optional option
    #[must_use]
    pub fn has(self, name: impl Into<String>, option_type: OptionType) -> Self {
        self.with_rule(name.into(), false, option_type)
    }

    /// Ignore options that are not part of the schema
    #[must_use]
    pub fn allow_additional_options(mut self) -> Self {
        self.allow_additional = true;
        self
    }

    fn with_rule(mut self, name: String, required: bool, option_type: OptionType) -> Self {
        self.rules.retain(|rule| rule.name != name);
        self.rules.push(OptionRule {
            name,
            required,
            option_type,
        });
        self
    }

    /// Validate `options` against this schema
    ///
    /// # Errors
    ///
    /// Returns the first violation found: a missing required option, an
    /// option of the wrong type, or the list of unsupported options.
    pub fn validate(&self, options: &Options) -> Result<(), OptionsError> {
        for rule in &self.rules {
            let value = match options.get(&rule.name) {
                None | Some(Value::Null) => {
                    if rule.required {
                        return Err(OptionsError::MissingRequired(rule.name.clone()));
                    }
                    continue;
                }
                Some(value) => value,
            };
            if !rule.option_type.matches(value) {
                return Err(OptionsError::WrongType {
                    option: rule.name.clone(),
                    expected: rule.option_type,
                    actual: type_name(value).to_string(),
                });
            }
        }

        if self.allow_additional {
            return Ok(());
        }
        let unsupported: Vec<String> = options
            .keys()
            .filter(|key| !self.rules.iter().any(|rule| &rule.name == *key))
            .cloned()
            .collect();
        if unsupported.is_empty() {
            Ok(())
        } else {
            Err(OptionsError::Unsupported(unsupported))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(value: Value) -> Options {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn schema() -> OptionsSchema {
        OptionsSchema::new()
            .requires("file_path", OptionType::String)
            .has("batch_size", OptionType::Integer)
            .has("strict", OptionType::Boolean)
    }

    #[test]
    fn test_valid_options() {
        assert!(schema()
            .validate(&options(json!({"file_path": "a.json", "batch_size": 10})))
            .is_ok());
    }

    #[test]
    fn test_missing_required() {
        let err = schema().validate(&options(json!({"file_path": null}))).unwrap_err();
        assert_eq!(err.to_string(), "Missing required option \"file_path\"");
    }

    #[test]
    fn test_wrong_type() {
        let err = schema()
            .validate(&options(json!({"file_path": "a", "batch_size": "ten"})))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Option \"batch_size\" must be of type integer but it is a string"
        );
    }

    #[test]
    fn test_unsupported_options() {
        let err = schema()
            .validate(&options(json!({"file_path": "a", "color": "red"})))
            .unwrap_err();
        assert_eq!(err.to_string(), "The following option is not supported: \"color\"");

        let err = schema()
            .validate(&options(json!({"file_path": "a", "color": "red", "size": 1})))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "The following options are not supported: \"color\", \"size\""
        );
    }

    #[test]
    fn test_additional_options_allowed() {
        let lenient = schema().allow_additional_options();
        assert!(lenient
            .validate(&options(json!({"file_path": "a", "color": "red"})))
            .is_ok());
    }
}
