//! Database connection management
//!
//! This module provides the in-memory SQLite backend that the store manager
//! owns. The whole database lives in memory; durability comes from
//! serializing it into a byte image and handing that image to a
//! [`SnapshotStore`](crate::database::snapshot::SnapshotStore).

use anyhow::{anyhow, Result};
use rusqlite::{params_from_iter, Connection, MAIN_DB};

use crate::database::core::row::{Row, SqlValue};

/// Core database connection wrapper
///
/// `DatabaseConn` wraps an in-memory SQLite connection and knows how to turn
/// itself into a snapshot image and back.
pub struct DatabaseConn {
    pub conn: Connection,
}

impl DatabaseConn {
    /// Create an empty in-memory database
    pub fn open_empty() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| anyhow!("Failed to create in-memory database: {}", e))?;

        let db = DatabaseConn { conn };
        db.configure()?;
        Ok(db)
    }

    /// Rebuild a database from a snapshot image
    ///
    /// An empty image yields an empty database. The image is validated by
    /// reading the schema table, so a corrupt image fails here rather than on
    /// the first caller query.
    pub fn from_image(image: &[u8]) -> Result<Self> {
        if image.is_empty() {
            return Self::open_empty();
        }

        let mut conn = Connection::open_in_memory()
            .map_err(|e| anyhow!("Failed to create in-memory database: {}", e))?;
        conn.deserialize_read_exact(MAIN_DB, image, image.len(), false)
            .map_err(|e| anyhow!("Failed to deserialize database image: {}", e))?;

        let db = DatabaseConn { conn };
        db.configure()?;

        let _: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| row.get(0))
            .map_err(|e| anyhow!("Database image is not readable: {}", e))?;

        Ok(db)
    }

    /// Configure the connection
    fn configure(&self) -> Result<()> {
        // Store temp tables in memory
        self.conn
            .execute("PRAGMA temp_store=MEMORY", [])
            .map_err(|e| anyhow!("Failed to set temp store: {}", e))?;

        Ok(())
    }

    /// Serialize the whole database into a snapshot image
    pub fn image(&self) -> Result<Vec<u8>> {
        let data = self
            .conn
            .serialize(MAIN_DB)
            .map_err(|e| anyhow!("Failed to serialize database: {}", e))?;
        Ok(data.to_vec())
    }

    /// Run a read statement and materialize every row
    ///
    /// Parameters are bound positionally when any are given; with none, the
    /// statement runs unbound and every placeholder reads as NULL. The
    /// prepared statement is dropped before returning on both the success
    /// and the error path.
    pub fn query_rows(&self, sql: &str, params: &[SqlValue]) -> rusqlite::Result<Vec<Row>> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = if params.is_empty() {
            stmt.raw_query()
        } else {
            stmt.query(params_from_iter(params.iter()))?
        };
        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            let values = (0..columns.len())
                .map(|idx| row.get::<_, SqlValue>(idx))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            results.push(Row::new(columns.clone(), values));
        }

        Ok(results)
    }

    /// Run a single statement with positional parameters
    ///
    /// Returns the number of rows changed. Statements that produce result
    /// columns (`RETURNING`, pragmas) are stepped to completion and report the
    /// number of rows they produced. Binding follows [`Self::query_rows`].
    pub fn execute_statement(&self, sql: &str, params: &[SqlValue]) -> rusqlite::Result<usize> {
        let mut stmt = self.conn.prepare(sql)?;

        if stmt.column_count() == 0 {
            return if params.is_empty() {
                stmt.raw_execute()
            } else {
                stmt.execute(params_from_iter(params.iter()))
            };
        }

        let mut rows = if params.is_empty() {
            stmt.raw_query()
        } else {
            stmt.query(params_from_iter(params.iter()))?
        };
        let mut produced = 0;
        while rows.next()?.is_some() {
            produced += 1;
        }
        Ok(produced)
    }

    /// Execute a SQL statement
    pub fn execute(&self, sql: &str) -> Result<usize> {
        self.conn
            .execute(sql, [])
            .map_err(|e| anyhow!("Failed to execute SQL: {}", e))
    }

    /// Begin an unchecked transaction
    ///
    /// Batches run inside one of these so a failing statement leaves no
    /// partial effect behind.
    pub fn transaction(&self) -> rusqlite::Result<rusqlite::Transaction<'_>> {
        self.conn.unchecked_transaction()
    }

    /// Check if a table exists in the database
    pub fn table_exists(&self, table_name: &str) -> Result<bool> {
        let count: i32 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                [table_name],
                |row| row.get(0),
            )
            .map_err(|e| anyhow!("Failed to check table existence: {}", e))?;
        Ok(count > 0)
    }

    /// Get the row count for a table
    pub fn table_count(&self, table_name: &str) -> Result<u64> {
        let query = format!("SELECT COUNT(*) FROM {}", table_name);
        let count: u64 = self
            .conn
            .query_row(&query, [], |row| row.get(0))
            .map_err(|e| anyhow!("Failed to get table count: {}", e))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_empty() {
        let db = DatabaseConn::open_empty();
        assert!(db.is_ok());
    }

    #[test]
    fn test_table_exists() {
        let db = DatabaseConn::open_empty().unwrap();
        db.execute("CREATE TABLE test_table (id INTEGER PRIMARY KEY)")
            .unwrap();

        assert!(db.table_exists("test_table").unwrap());
        assert!(!db.table_exists("nonexistent_table").unwrap());
    }

    #[test]
    fn test_image_roundtrip() {
        let db = DatabaseConn::open_empty().unwrap();
        db.execute("CREATE TABLE test_table (id INTEGER PRIMARY KEY, name TEXT)")
            .unwrap();
        db.execute("INSERT INTO test_table (id, name) VALUES (1, 'a'), (2, 'b')")
            .unwrap();

        let image = db.image().unwrap();
        assert!(!image.is_empty());

        let restored = DatabaseConn::from_image(&image).unwrap();
        assert_eq!(restored.table_count("test_table").unwrap(), 2);
    }

    #[test]
    fn test_empty_image_is_empty_database() {
        let db = DatabaseConn::from_image(&[]).unwrap();
        let rows = db
            .query_rows("SELECT name FROM sqlite_master", &[])
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_garbage_image_rejected() {
        let garbage = vec![0x42u8; 4096];
        assert!(DatabaseConn::from_image(&garbage).is_err());
    }

    #[test]
    fn test_query_rows_binds_params() {
        let db = DatabaseConn::open_empty().unwrap();
        db.execute("CREATE TABLE t (id INTEGER, label TEXT)").unwrap();
        db.execute("INSERT INTO t VALUES (1, 'one'), (2, 'two'), (3, 'three')")
            .unwrap();

        let rows = db
            .query_rows(
                "SELECT id, label FROM t WHERE id >= ?1 ORDER BY id",
                &[SqlValue::Integer(2)],
            )
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].columns(), &["id".to_string(), "label".to_string()]);
        assert_eq!(rows[1].get_str("label"), Some("three"));
    }

    #[test]
    fn test_unbound_placeholders_read_as_null() {
        let db = DatabaseConn::open_empty().unwrap();
        db.execute("CREATE TABLE t (id INTEGER, label TEXT)").unwrap();
        db.execute("INSERT INTO t VALUES (1, 'one')").unwrap();

        let rows = db.query_rows("SELECT * FROM t WHERE id = ?", &[]).unwrap();
        assert!(rows.is_empty());

        let rows = db.query_rows("SELECT ?1 IS NULL AS unbound", &[]).unwrap();
        assert_eq!(rows[0].get_i64("unbound"), Some(1));

        let changed = db
            .execute_statement("INSERT INTO t (id, label) VALUES (2, ?)", &[])
            .unwrap();
        assert_eq!(changed, 1);
        let rows = db
            .query_rows("SELECT label FROM t WHERE id = 2", &[])
            .unwrap();
        assert_eq!(rows[0].get("label"), Some(&SqlValue::Null));

        let produced = db
            .execute_statement("DELETE FROM t WHERE id = ? RETURNING id", &[])
            .unwrap();
        assert_eq!(produced, 0);
    }

    #[test]
    fn test_execute_statement_with_returning() {
        let db = DatabaseConn::open_empty().unwrap();
        db.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, label TEXT)")
            .unwrap();

        let changed = db
            .execute_statement(
                "INSERT INTO t (label) VALUES (?1)",
                &[SqlValue::Text("x".into())],
            )
            .unwrap();
        assert_eq!(changed, 1);

        let produced = db
            .execute_statement(
                "INSERT INTO t (label) VALUES (?1) RETURNING id",
                &[SqlValue::Text("y".into())],
            )
            .unwrap();
        assert_eq!(produced, 1);
        assert_eq!(db.table_count("t").unwrap(), 2);
    }
}
