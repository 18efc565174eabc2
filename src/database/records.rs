//! Typed views over bookmark store rows
//!
//! The store itself speaks SQL and [`Row`]s. These records give callers a
//! typed shape for the three baseline tables and the canonical queries that
//! produce them.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::database::core::Row;

/// A bookmark row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkRecord {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chrome_id: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_added: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_modified: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl BookmarkRecord {
    /// Query listing every bookmark, oldest first
    pub const SELECT_ALL: &'static str = "SELECT * FROM bookmarks ORDER BY date_added, id";

    /// Query listing the bookmarks carrying a tag name
    pub const SELECT_BY_TAG: &'static str = r#"
        SELECT b.* FROM bookmarks AS b
        JOIN bookmark_tags AS bt ON bt.bookmark_id = b.id
        JOIN tags AS t ON t.id = bt.tag_id
        WHERE t.name = ?1
        ORDER BY b.date_added, b.id
    "#;
}

impl TryFrom<&Row> for BookmarkRecord {
    type Error = anyhow::Error;

    fn try_from(row: &Row) -> Result<Self> {
        Ok(Self {
            id: required_str(row, "id")?,
            chrome_id: optional_str(row, "chrome_id"),
            title: required_str(row, "title")?,
            url: optional_str(row, "url"),
            internal_url: optional_str(row, "internal_url"),
            icon_url: optional_str(row, "icon_url"),
            parent_id: optional_str(row, "parent_id"),
            date_added: row.get_i64("date_added"),
            date_modified: row.get_i64("date_modified"),
            created_at: row.get_i64("created_at"),
            updated_at: row.get_i64("updated_at"),
        })
    }
}

/// A tag row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    /// Number of bookmarks carrying the tag, when the query provides it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bookmark_count: Option<i64>,
}

impl TagRecord {
    /// Query listing every tag with its bookmark count
    pub const SELECT_ALL_WITH_COUNTS: &'static str = r#"
        SELECT t.id, t.name, t.color, t.created_at, COUNT(bt.bookmark_id) AS bookmark_count
        FROM tags AS t
        LEFT JOIN bookmark_tags AS bt ON bt.tag_id = t.id
        GROUP BY t.id
        ORDER BY t.name
    "#;
}

impl TryFrom<&Row> for TagRecord {
    type Error = anyhow::Error;

    fn try_from(row: &Row) -> Result<Self> {
        Ok(Self {
            id: required_str(row, "id")?,
            name: required_str(row, "name")?,
            color: optional_str(row, "color"),
            created_at: row.get_i64("created_at"),
            bookmark_count: row.get_i64("bookmark_count"),
        })
    }
}

/// A bookmark/tag association row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkTagRecord {
    pub bookmark_id: String,
    pub tag_id: String,
}

impl TryFrom<&Row> for BookmarkTagRecord {
    type Error = anyhow::Error;

    fn try_from(row: &Row) -> Result<Self> {
        Ok(Self {
            bookmark_id: required_str(row, "bookmark_id")?,
            tag_id: required_str(row, "tag_id")?,
        })
    }
}

/// Convert a list of rows, failing on the first row that does not fit
pub fn from_rows<'a, T>(rows: &'a [Row]) -> Result<Vec<T>>
where
    T: TryFrom<&'a Row, Error = anyhow::Error>,
{
    rows.iter().map(T::try_from).collect()
}

fn required_str(row: &Row, column: &str) -> Result<String> {
    row.get_str(column)
        .map(String::from)
        .ok_or_else(|| anyhow!("Column '{}' is missing or not text", column))
}

fn optional_str(row: &Row, column: &str) -> Option<String> {
    row.get_str(column).map(String::from)
}
