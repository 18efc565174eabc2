use anyhow::Result;
use bookmarks_kit::config::BookmarksKitConfig;
use bookmarks_kit::database::{from_rows, BookmarkRecord, Row, SqlValue, TagRecord};
use clap::Args;

use super::{format_rows, OutputFormat};

/// Arguments for the bookmarks command
#[derive(Args, Debug)]
pub struct BookmarksArgs {
    /// Only list bookmarks carrying this tag name
    #[clap(short, long)]
    pub tag: Option<String>,
}

/// List bookmarks, optionally filtered by tag
pub async fn run_bookmarks(
    config: &BookmarksKitConfig,
    args: BookmarksArgs,
    format: OutputFormat,
) -> Result<()> {
    let manager = config.store_manager();
    manager.initialize().await?;

    let rows = match &args.tag {
        Some(tag) => manager.query(BookmarkRecord::SELECT_BY_TAG, &[SqlValue::Text(tag.clone())])?,
        None => manager.query(BookmarkRecord::SELECT_ALL, &[])?,
    };
    let bookmarks: Vec<BookmarkRecord> = from_rows(&rows)?;

    print_listing(&bookmarks, &rows, format)
}

/// List tags with the number of bookmarks carrying each
pub async fn run_tags(config: &BookmarksKitConfig, format: OutputFormat) -> Result<()> {
    let manager = config.store_manager();
    manager.initialize().await?;

    let rows = manager.query(TagRecord::SELECT_ALL_WITH_COUNTS, &[])?;
    let tags: Vec<TagRecord> = from_rows(&rows)?;

    print_listing(&tags, &rows, format)
}

fn print_listing<T: serde::Serialize>(records: &[T], rows: &[Row], format: OutputFormat) -> Result<()> {
    let out = match format {
        OutputFormat::Json => serde_json::to_string(records)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(records)?,
        _ => format_rows(rows, format)?,
    };
    if !out.is_empty() {
        println!("{}", out);
    }
    Ok(())
}
