//! Readiness report of sources and targets

use serde::Serialize;

/// Aggregated result of `setup` checks
///
/// Messages are classified into errors (the preset cannot run), warnings
/// (it can run but something needs attention) and informational notices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SetupResult {
    errors: Vec<String>,
    warnings: Vec<String>,
    notices: Vec<String>,
}

impl SetupResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn add_notice(&mut self, message: impl Into<String>) {
        self.notices.push(message.into());
    }

    #[must_use]
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.add_error(message);
        self
    }

    #[must_use]
    pub fn with_warning(mut self, message: impl Into<String>) -> Self {
        self.add_warning(message);
        self
    }

    #[must_use]
    pub fn with_notice(mut self, message: impl Into<String>) -> Self {
        self.add_notice(message);
        self
    }

    /// Append all messages of `other`, keeping their classification
    pub fn merge(&mut self, other: SetupResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.notices.extend(other.notices);
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty() && self.notices.is_empty()
    }
}
