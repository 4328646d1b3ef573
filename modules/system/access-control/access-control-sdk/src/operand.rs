//! Operand comparison.
//!
//! Operands are compared by their textual form so that a numeric principal
//! identifier matches the same identifier taken from a path parameter.

use serde_json::Value;

/// Textual form of a scalar operand.
///
/// Strings are returned as-is, booleans as `true`/`false`, numbers in their
/// shortest form (`2.0` becomes `"2"`). `null`, arrays and objects have no
/// textual form.
#[must_use]
pub fn canonical_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                Some(n.to_string())
            } else {
                n.as_f64().map(|f| f.to_string())
            }
        }
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Whether two resolved operands denote the same owner.
///
/// Absent or non-scalar operands never match, not even each other.
#[must_use]
pub fn operands_match(first: Option<&Value>, second: Option<&Value>) -> bool {
    match (
        first.and_then(canonical_text),
        second.and_then(canonical_text),
    ) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
