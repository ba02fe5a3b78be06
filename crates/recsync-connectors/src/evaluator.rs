//! Expression evaluator without expression support

use serde_json::Value;

use recsync_core::domain::Attributes;
use recsync_core::ports::IExpressionEvaluator;

/// Recognises no expressions, so every mapping rule is an attribute name
#[derive(Debug, Clone, Copy, Default)]
pub struct NullExpressionEvaluator;

impl IExpressionEvaluator for NullExpressionEvaluator {
    fn is_expression(&self, _text: &str) -> bool {
        false
    }

    fn evaluate(&self, expression: &str, _variables: &Attributes) -> anyhow::Result<Value> {
        anyhow::bail!("Expressions are not supported: {}", expression)
    }
}
