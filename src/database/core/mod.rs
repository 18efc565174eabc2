//! Core database infrastructure
//!
//! This module provides the foundational database components used by the store:
//! - `DatabaseConn`: In-memory SQLite backend with snapshot image support
//! - `Row` / `SqlValue`: Materialized result rows and positional parameters
//! - `SchemaManager`: Baseline schema creation and additive migration
//! - `SchemaStatus`: Schema state enumeration

mod connection;
mod row;
mod schema;

pub use connection::DatabaseConn;
pub use row::{value_to_json, Row, SqlValue};
pub use schema::{MigrationReport, SchemaDefinitions, SchemaManager, SchemaStatus, SCHEMA_VERSION};
