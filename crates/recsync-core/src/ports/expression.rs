//! Expression evaluator port
//!
//! Field-mapping rules may either name a source attribute directly or hold
//! an expression in a host-supplied language. The core never parses that
//! language; it only asks the evaluator whether a rule is an expression
//! and, if so, to evaluate it against a set of variables.

use serde_json::Value;

use crate::domain::Attributes;

/// Port trait for evaluating mapping expressions
pub trait IExpressionEvaluator: Send + Sync {
    /// Returns true if `text` is an expression rather than an attribute name
    fn is_expression(&self, text: &str) -> bool;

    /// Evaluate `expression` with the given variables in scope
    fn evaluate(&self, expression: &str, variables: &Attributes) -> anyhow::Result<Value>;
}
