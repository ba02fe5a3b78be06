//! Domain error types
//!
//! This module defines error types specific to the record model:
//! construction and parsing failures of value objects, and failures
//! while reading attributes of a (possibly lazy) record.

use thiserror::Error;

/// Errors that can occur while building or parsing domain values
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A raw row does not contain the configured id attribute
    #[error("the id attribute \"{0}\" is not part of the data source")]
    MissingIdAttribute(String),

    /// A raw row does not contain the configured version attribute
    #[error("the version attribute \"{0}\" is not part of the data source")]
    MissingVersionAttribute(String),

    /// The id attribute holds a value that cannot be used as an identifier
    #[error("Invalid id value for attribute \"{attribute}\": {value}")]
    InvalidId {
        /// Name of the id attribute
        attribute: String,
        /// The offending raw value
        value: String,
    },

    /// A version would be negative
    #[error("version must not be less than 0, given: {0}")]
    NegativeVersion(i64),

    /// A raw value could not be interpreted as a version
    #[error("Could not parse {0} as record version")]
    InvalidVersion(String),

    /// A date string could not be parsed
    #[error("Could not parse \"{0}\" as date")]
    InvalidDate(String),

    /// A timezone specification could not be parsed
    #[error("Unsupported timezone: {0}")]
    InvalidTimezone(String),
}

/// Errors that can occur while reading the attributes of a record
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// The requested attribute does not exist on the record
    #[error("attribute \"{attribute}\" is not set on record \"{id}\"")]
    MissingAttribute {
        /// Record identifier
        id: String,
        /// Requested attribute name
        attribute: String,
    },

    /// The deferred loader of a lazy record failed
    #[error("failed to load attributes of record \"{id}\": {reason}")]
    LazyLoad {
        /// Record identifier
        id: String,
        /// Rendered cause chain of the loader failure
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::MissingIdAttribute("uid".to_string());
        assert_eq!(
            err.to_string(),
            "the id attribute \"uid\" is not part of the data source"
        );

        let err = DomainError::NegativeVersion(-4);
        assert_eq!(err.to_string(), "version must not be less than 0, given: -4");

        let err = RecordError::MissingAttribute {
            id: "42".to_string(),
            attribute: "title".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "attribute \"title\" is not set on record \"42\""
        );
    }

    #[test]
    fn test_error_equality() {
        let err1 = DomainError::InvalidDate("tomorrow-ish".to_string());
        let err2 = DomainError::InvalidDate("tomorrow-ish".to_string());
        let err3 = DomainError::InvalidDate("yesterday".to_string());

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }
}
