pub mod init;
pub mod list;
pub mod sql;
pub mod status;
pub mod transfer;

use std::fmt;
use std::str::FromStr;

use bookmarks_kit::database::{Row, SqlValue};
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;

/// Output format shared by all commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty table with borders (default)
    #[default]
    Table,
    /// Markdown table format
    Markdown,
    /// Compact JSON
    Json,
    /// Pretty-printed JSON with indentation
    JsonPretty,
    /// Pipe-separated values with header
    Psv,
}

impl OutputFormat {
    pub fn all_names() -> &'static [&'static str] {
        &["table", "markdown", "json", "json-pretty", "psv"]
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Markdown => write!(f, "markdown"),
            Self::Json => write!(f, "json"),
            Self::JsonPretty => write!(f, "json-pretty"),
            Self::Psv => write!(f, "psv"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" | "pretty" => Ok(Self::Table),
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            "json-pretty" | "jsonpretty" => Ok(Self::JsonPretty),
            "psv" | "pipe" => Ok(Self::Psv),
            _ => Err(format!(
                "Unknown output format '{}'. Valid formats: {}",
                s,
                Self::all_names().join(", ")
            )),
        }
    }
}

/// Parse a command-line statement parameter.
///
/// `null` binds NULL, integers and reals bind as numbers, anything else
/// binds as text.
pub(crate) fn parse_param(raw: &str) -> SqlValue {
    if raw.eq_ignore_ascii_case("null") {
        return SqlValue::Null;
    }
    if let Ok(v) = raw.parse::<i64>() {
        return SqlValue::Integer(v);
    }
    if let Ok(v) = raw.parse::<f64>() {
        if v.is_finite() {
            return SqlValue::Real(v);
        }
    }
    SqlValue::Text(raw.to_string())
}

fn cell(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => String::new(),
        SqlValue::Integer(v) => v.to_string(),
        SqlValue::Real(v) => v.to_string(),
        SqlValue::Text(v) => v.clone(),
        SqlValue::Blob(v) => format!("<{} bytes>", v.len()),
    }
}

/// Render raw query rows in the requested format
pub(crate) fn format_rows(rows: &[Row], format: OutputFormat) -> Result<String, anyhow::Error> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(rows)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(rows)?),
        OutputFormat::Psv => {
            let Some(first) = rows.first() else {
                return Ok(String::new());
            };
            let mut lines = vec![first.columns().join("|")];
            for row in rows {
                lines.push(row.values().iter().map(cell).collect::<Vec<_>>().join("|"));
            }
            Ok(lines.join("\n"))
        }
        OutputFormat::Table | OutputFormat::Markdown => {
            let Some(first) = rows.first() else {
                return Ok("(no rows)".to_string());
            };
            let mut builder = Builder::default();
            builder.push_record(first.columns().iter().cloned());
            for row in rows {
                builder.push_record(row.values().iter().map(cell));
            }
            let mut table = builder.build();
            match format {
                OutputFormat::Markdown => table.with(Style::markdown()),
                _ => table.with(Style::rounded()),
            };
            Ok(table.to_string())
        }
    }
}

/// Render a single serializable value, falling back to `plain` for text formats
pub(crate) fn format_value<T: Serialize>(
    value: &T,
    format: OutputFormat,
    plain: impl FnOnce() -> String,
) -> Result<String, anyhow::Error> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(value)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(value)?),
        _ => Ok(plain()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param() {
        assert_eq!(parse_param("NULL"), SqlValue::Null);
        assert_eq!(parse_param("42"), SqlValue::Integer(42));
        assert_eq!(parse_param("-1.5"), SqlValue::Real(-1.5));
        assert_eq!(parse_param("inf"), SqlValue::Text("inf".into()));
        assert_eq!(parse_param("rust"), SqlValue::Text("rust".into()));
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("md".parse::<OutputFormat>(), Ok(OutputFormat::Markdown));
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_format_rows_psv() {
        let rows = vec![
            Row::new(
                vec!["id".into(), "name".into()],
                vec![SqlValue::Text("t1".into()), SqlValue::Null],
            ),
            Row::new(
                vec!["id".into(), "name".into()],
                vec![SqlValue::Text("t2".into()), SqlValue::Text("rust".into())],
            ),
        ];
        let out = format_rows(&rows, OutputFormat::Psv).unwrap();
        assert_eq!(out, "id|name\nt1|\nt2|rust");

        let out = format_rows(&rows, OutputFormat::Json).unwrap();
        assert_eq!(out, r#"[{"id":"t1","name":null},{"id":"t2","name":"rust"}]"#);
    }
}
