//! Row and parameter types
//!
//! Query results are materialized into [`Row`]s, ordered column→value
//! mappings that outlive the prepared statement they came from.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// A scalar SQL value, used both for positional parameters and result cells
pub type SqlValue = rusqlite::types::Value;

/// A single materialized result row
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl Row {
    /// Create a row from parallel column and value lists
    pub fn new(columns: Vec<String>, values: Vec<SqlValue>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Column names in result order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values in result order
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Look up a value by column name
    ///
    /// When a result has duplicate column names, the first one wins.
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.values[idx])
    }

    /// Integer value of a column, `None` for NULL, missing or non-integer cells
    pub fn get_i64(&self, column: &str) -> Option<i64> {
        match self.get(column)? {
            SqlValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Text value of a column, `None` for NULL, missing or non-text cells
    pub fn get_str(&self, column: &str) -> Option<&str> {
        match self.get(column)? {
            SqlValue::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Iterate `(column, value)` pairs in result order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

/// Convert a SQL value to JSON
///
/// Blobs become arrays of bytes; non-finite reals become `null`.
pub fn value_to_json(value: &SqlValue) -> serde_json::Value {
    match value {
        SqlValue::Null => serde_json::Value::Null,
        SqlValue::Integer(v) => serde_json::Value::from(*v),
        SqlValue::Real(v) => serde_json::Number::from_f64(*v)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        SqlValue::Text(v) => serde_json::Value::from(v.as_str()),
        SqlValue::Blob(v) => serde_json::Value::from(v.clone()),
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, &value_to_json(value))?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> Row {
        Row::new(
            vec!["id".into(), "title".into(), "icon_url".into()],
            vec![
                SqlValue::Integer(7),
                SqlValue::Text("Rust".into()),
                SqlValue::Null,
            ],
        )
    }

    #[test]
    fn test_lookup() {
        let row = sample_row();
        assert_eq!(row.len(), 3);
        assert_eq!(row.get_i64("id"), Some(7));
        assert_eq!(row.get_str("title"), Some("Rust"));
        assert_eq!(row.get("icon_url"), Some(&SqlValue::Null));
        assert_eq!(row.get_str("icon_url"), None);
        assert!(row.get("missing").is_none());
    }

    #[test]
    fn test_serialize_keeps_column_order() {
        let json = serde_json::to_string(&sample_row()).unwrap();
        assert_eq!(json, r#"{"id":7,"title":"Rust","icon_url":null}"#);
    }
}
