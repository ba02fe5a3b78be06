//! Domain newtypes with validation
//!
//! This module provides the identity and version value types used as
//! the join key and staleness marker between source and target records.

use std::borrow::Borrow;
use std::fmt::{self, Display, Formatter};

use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::DomainError;

// ============================================================================
// RecordId
// ============================================================================

/// Opaque identifier of a record
///
/// Equality is by value. A `RecordId` is the join key between the records
/// of a source and the rows of a target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Create a RecordId from any string-like value
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the identifier as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the identifier and return the inner string
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for RecordId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// RecordVersion
// ============================================================================

/// Ordered version marker of a record
///
/// A version is either *unset* (the sentinel that is always considered
/// outdated, which forces an update) or a non-negative integer, typically a
/// unix timestamp or an external revision number.
///
/// The derived ordering places `Unset` below every `Set` value, so
/// [`RecordVersion::is_higher_than`] is a plain strict comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordVersion {
    /// No version information available
    #[default]
    Unset,
    /// A concrete, non-negative version number
    Set(u64),
}

impl RecordVersion {
    /// The unset sentinel
    #[must_use]
    pub const fn none() -> Self {
        Self::Unset
    }

    /// Create a version from a signed number
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NegativeVersion`] if `value` is negative.
    pub fn from_number(value: i64) -> Result<Self, DomainError> {
        u64::try_from(value)
            .map(Self::Set)
            .map_err(|_| DomainError::NegativeVersion(value))
    }

    /// Create a version from a point in time (seconds since the unix epoch)
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NegativeVersion`] for dates before 1970.
    pub fn from_date_time<Z: TimeZone>(date: &DateTime<Z>) -> Result<Self, DomainError> {
        Self::from_number(date.timestamp())
    }

    /// Parse a date string, optionally interpreted in the given timezone
    ///
    /// Strings carrying their own offset (RFC 3339, `2024-01-31 10:00:00 +0200`)
    /// ignore `timezone`. Naive strings (`2024-01-31 10:00:00`, `2024-01-31`)
    /// are interpreted in `timezone`, or UTC when none is given. Timezones are
    /// fixed offsets (`+02:00`, `-0530`), `UTC` / `Z` / `GMT`, or IANA zone
    /// names (`Europe/Berlin`). A local time repeated by a DST change resolves
    /// to its earliest instant; one skipped by it is an invalid date.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidDate`] or [`DomainError::InvalidTimezone`]
    /// if the input cannot be interpreted.
    pub fn from_date_string(date: &str, timezone: Option<&str>) -> Result<Self, DomainError> {
        let trimmed = date.trim();

        if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
            return Self::from_date_time(&parsed);
        }
        for format in ["%Y-%m-%d %H:%M:%S %z", "%Y-%m-%d %H:%M:%S%z", "%Y-%m-%dT%H:%M:%S%z"] {
            if let Ok(parsed) = DateTime::parse_from_str(trimmed, format) {
                return Self::from_date_time(&parsed);
            }
        }

        let naive = parse_naive(trimmed)
            .ok_or_else(|| DomainError::InvalidDate(date.to_string()))?;
        let zone = match timezone {
            Some(tz) => Zone::parse(tz)?,
            None => Zone::Fixed(Utc.fix()),
        };
        let timestamp = zone
            .timestamp(&naive)
            .ok_or_else(|| DomainError::InvalidDate(date.to_string()))?;
        Self::from_number(timestamp)
    }

    /// Parse a raw attribute value into a version
    ///
    /// Accepted inputs:
    /// - numbers (and numeric strings), which must not be negative
    /// - date strings, see [`RecordVersion::from_date_string`]
    /// - objects of the form `{"date": "...", "timezone": "..."}`
    ///
    /// # Errors
    ///
    /// Returns a [`DomainError`] describing why the value was rejected.
    pub fn parse(value: &Value) -> Result<Self, DomainError> {
        match value {
            Value::Object(map) => {
                let date = map.get("date").and_then(Value::as_str).ok_or_else(|| {
                    DomainError::InvalidVersion("object without a \"date\" string".to_string())
                })?;
                let timezone = map.get("timezone").and_then(Value::as_str);
                Self::from_date_string(date, timezone)
            }
            Value::Number(number) => {
                if let Some(signed) = number.as_i64() {
                    Self::from_number(signed)
                } else if let Some(unsigned) = number.as_u64() {
                    Ok(Self::Set(unsigned))
                } else {
                    // floats are truncated like any other numeric input
                    let float = number.as_f64().unwrap_or(f64::NAN);
                    if float.is_finite() {
                        Self::from_number(float.trunc() as i64)
                    } else {
                        Err(DomainError::InvalidVersion(number.to_string()))
                    }
                }
            }
            Value::String(text) => match numeric_string(text) {
                Some(number) => Self::from_number(number),
                None => Self::from_date_string(text, None),
            },
            other => Err(DomainError::InvalidVersion(format!("{} value", type_name(other)))),
        }
    }

    /// Strict comparison; equal versions are never higher
    #[must_use]
    pub fn is_higher_than(&self, other: &RecordVersion) -> bool {
        self > other
    }

    /// Returns true for the unset sentinel
    #[must_use]
    pub fn is_not_set(&self) -> bool {
        matches!(self, RecordVersion::Unset)
    }

    /// Returns the numeric version, if set
    #[must_use]
    pub fn value(&self) -> Option<u64> {
        match self {
            RecordVersion::Unset => None,
            RecordVersion::Set(value) => Some(*value),
        }
    }
}

impl Display for RecordVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RecordVersion::Unset => write!(f, "unset"),
            RecordVersion::Set(value) => write!(f, "{}", value),
        }
    }
}

// ============================================================================
// Parsing helpers
// ============================================================================

fn parse_naive(text: &str) -> Option<NaiveDateTime> {
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some(parsed);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Timezone a naive date is interpreted in
enum Zone {
    Fixed(FixedOffset),
    Named(Tz),
}

impl Zone {
    fn parse(timezone: &str) -> Result<Self, DomainError> {
        if let Some(offset) = parse_offset(timezone) {
            return Ok(Zone::Fixed(offset));
        }
        timezone
            .trim()
            .parse::<Tz>()
            .map(Zone::Named)
            .map_err(|_| DomainError::InvalidTimezone(timezone.to_string()))
    }

    fn timestamp(&self, naive: &NaiveDateTime) -> Option<i64> {
        match self {
            Zone::Fixed(offset) => offset.from_local_datetime(naive).single().map(|d| d.timestamp()),
            Zone::Named(tz) => tz.from_local_datetime(naive).earliest().map(|d| d.timestamp()),
        }
    }
}

fn parse_offset(timezone: &str) -> Option<FixedOffset> {
    let trimmed = timezone.trim();
    if matches!(trimmed.to_ascii_uppercase().as_str(), "UTC" | "Z" | "GMT") {
        return Some(Utc.fix());
    }

    let (sign, rest) = if let Some(rest) = trimmed.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = trimmed.strip_prefix('-') {
        (-1, rest)
    } else {
        return None;
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes): (i32, i32) = match digits.len() {
        1 | 2 => (digits.parse().ok()?, 0),
        3 | 4 => {
            let split = digits.len() - 2;
            (digits[..split].parse().ok()?, digits[split..].parse().ok()?)
        }
        _ => return None,
    };
    if minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn numeric_string(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    if let Ok(number) = trimmed.parse::<i64>() {
        return Some(number);
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|float| float.is_finite())
        .map(|float| float.trunc() as i64)
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    mod record_id_tests {
        use super::*;

        #[test]
        fn test_equality_by_value() {
            assert_eq!(RecordId::new("abc"), RecordId::from("abc"));
            assert_ne!(RecordId::new("abc"), RecordId::new("abd"));
        }

        #[test]
        fn test_display_and_serde() {
            let id = RecordId::new("product-7");
            assert_eq!(id.to_string(), "product-7");
            assert_eq!(serde_json::to_string(&id).unwrap(), "\"product-7\"");
        }
    }

    mod record_version_tests {
        use super::*;

        #[test]
        fn test_ordering() {
            let five = RecordVersion::from_number(5).unwrap();
            let three = RecordVersion::from_number(3).unwrap();
            assert!(five.is_higher_than(&three));
            assert!(!three.is_higher_than(&five));
            assert!(!three.is_higher_than(&RecordVersion::from_number(3).unwrap()));
        }

        #[test]
        fn test_unset_sentinel() {
            assert!(RecordVersion::none().is_not_set());
            assert!(!RecordVersion::from_number(0).unwrap().is_not_set());
            assert!(RecordVersion::from_number(0)
                .unwrap()
                .is_higher_than(&RecordVersion::none()));
            assert!(!RecordVersion::none().is_higher_than(&RecordVersion::none()));
        }

        #[test]
        fn test_negative_rejected() {
            assert_eq!(
                RecordVersion::from_number(-1),
                Err(DomainError::NegativeVersion(-1))
            );
            assert!(RecordVersion::parse(&json!(-10)).is_err());
        }

        #[test]
        fn test_parse_numbers() {
            assert_eq!(RecordVersion::parse(&json!(42)).unwrap(), RecordVersion::Set(42));
            assert_eq!(RecordVersion::parse(&json!("42")).unwrap(), RecordVersion::Set(42));
            assert_eq!(RecordVersion::parse(&json!(42.9)).unwrap(), RecordVersion::Set(42));
        }

        #[test]
        fn test_parse_rfc3339() {
            let version = RecordVersion::parse(&json!("2019-06-14T12:00:00+02:00")).unwrap();
            assert_eq!(version, RecordVersion::Set(1_560_506_400));
        }

        #[test]
        fn test_parse_naive_date_defaults_to_utc() {
            let version = RecordVersion::parse(&json!("2019-06-14 10:00:00")).unwrap();
            assert_eq!(version, RecordVersion::Set(1_560_506_400));

            let midnight = RecordVersion::parse(&json!("2019-06-14")).unwrap();
            assert_eq!(midnight, RecordVersion::Set(1_560_470_400));
        }

        #[test]
        fn test_parse_structured_date_with_timezone() {
            let version = RecordVersion::parse(&json!({
                "date": "2019-06-14 12:00:00",
                "timezone": "+02:00"
            }))
            .unwrap();
            assert_eq!(version, RecordVersion::Set(1_560_506_400));

            let utc = RecordVersion::parse(&json!({"date": "2019-06-14 10:00:00", "timezone": "UTC"}))
                .unwrap();
            assert_eq!(utc, version);
        }

        #[test]
        fn test_parse_structured_date_with_named_zone() {
            let summer = RecordVersion::parse(&json!({
                "date": "2019-06-14 12:00:00",
                "timezone": "Europe/Berlin"
            }))
            .unwrap();
            assert_eq!(summer, RecordVersion::Set(1_560_506_400));

            let winter = RecordVersion::from_date_string("2019-01-14 11:00:00", Some("Europe/Berlin"))
                .unwrap();
            assert_eq!(winter, RecordVersion::Set(1_547_460_000));

            // 02:30 happens twice on this night; the earlier instant wins
            let repeated =
                RecordVersion::from_date_string("2019-10-27 02:30:00", Some("Europe/Berlin")).unwrap();
            assert_eq!(repeated, RecordVersion::Set(1_572_136_200));

            // skipped by the switch to summer time
            assert!(matches!(
                RecordVersion::from_date_string("2019-03-31 02:30:00", Some("Europe/Berlin")),
                Err(DomainError::InvalidDate(_))
            ));
        }

        #[test]
        fn test_parse_rejects_garbage() {
            assert!(matches!(
                RecordVersion::parse(&json!("not a date")),
                Err(DomainError::InvalidDate(_))
            ));
            assert!(matches!(
                RecordVersion::parse(&json!({"timezone": "UTC"})),
                Err(DomainError::InvalidVersion(_))
            ));
            assert!(matches!(
                RecordVersion::parse(&json!({"date": "2019-06-14", "timezone": "Mars/Olympus"})),
                Err(DomainError::InvalidTimezone(_))
            ));
            assert!(matches!(
                RecordVersion::parse(&json!(true)),
                Err(DomainError::InvalidVersion(_))
            ));
        }

        #[test]
        fn test_display() {
            assert_eq!(RecordVersion::none().to_string(), "unset");
            assert_eq!(RecordVersion::Set(17).to_string(), "17");
        }
    }
}
