//! Row filters.

use serde_json::Value;

use crate::service::Row;

/// An equality filter on a single column.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Column name.
    pub column: String,
    /// Value the column must equal.
    pub value: Value,
}

impl Filter {
    /// Match rows where `column` equals `value`.
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Render as a PostgREST query parameter pair.
    ///
    /// A null value becomes `is.null`, since `eq.null` compares against the
    /// string "null".
    pub fn to_query_pair(&self) -> (String, String) {
        let operand = match &self.value {
            Value::Null => "is.null".to_string(),
            Value::String(s) => format!("eq.{}", s),
            other => format!("eq.{}", other),
        };
        (self.column.clone(), operand)
    }

    /// Check whether a row satisfies this filter.
    pub fn matches(&self, row: &Row) -> bool {
        let cell = row.get(&self.column).unwrap_or(&Value::Null);
        values_equal(cell, &self.value)
    }
}

/// Compare two JSON values the way the database would for equality.
///
/// Numbers compare by value so that `5` and `5.0` are equal.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        _ => a == b,
    }
}
