use anyhow::Result;
use bookmarks_kit::config::BookmarksKitConfig;
use bookmarks_kit::database::SqlValue;
use clap::Args;
use serde::Serialize;
use tracing::info;

use super::{format_rows, format_value, parse_param, OutputFormat};

/// Arguments shared by the query and exec commands
#[derive(Args, Debug)]
pub struct SqlArgs {
    /// SQL statement, with `?1`, `?2`... placeholders for parameters
    #[clap(name = "SQL")]
    pub sql: String,

    /// Positional parameter: an integer, a real, `null`, or text
    #[clap(short = 'p', long = "param")]
    pub params: Vec<String>,
}

impl SqlArgs {
    fn bind(&self) -> Vec<SqlValue> {
        self.params.iter().map(|p| parse_param(p)).collect()
    }
}

#[derive(Debug, Serialize)]
struct ExecResult {
    rows_changed: usize,
}

/// Run a read-only statement and print its rows
pub async fn run_query(config: &BookmarksKitConfig, args: SqlArgs, format: OutputFormat) -> Result<()> {
    let manager = config.store_manager();
    manager.initialize().await?;

    let rows = manager.query(&args.sql, &args.bind())?;
    info!("query returned {} rows", rows.len());

    let out = format_rows(&rows, format)?;
    if !out.is_empty() {
        println!("{}", out);
    }
    Ok(())
}

/// Run a mutating statement and persist the result
pub async fn run_exec(config: &BookmarksKitConfig, args: SqlArgs, format: OutputFormat) -> Result<()> {
    let manager = config.store_manager();
    manager.initialize().await?;

    let rows_changed = manager.execute(&args.sql, &args.bind()).await?;

    let result = ExecResult { rows_changed };
    let out = format_value(&result, format, || {
        format!("{} row(s) changed", result.rows_changed)
    })?;
    println!("{}", out);
    Ok(())
}
