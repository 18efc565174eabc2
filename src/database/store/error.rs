//! Store manager errors

/// Errors surfaced by [`StoreManager`](super::StoreManager)
///
/// Errors are `Clone` so that every caller joined on the same in-flight
/// initialization receives the same failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A data operation was invoked before a successful `initialize()`
    NotInitialized,

    /// Backend construction, image deserialization, or baseline schema
    /// creation failed
    Initialization(String),

    /// The snapshot store failed to load or save an image
    Persistence(String),

    /// A migration step failed. Migration errors are logged and absorbed,
    /// so this variant only appears in reports and logs.
    Migration(String),

    /// A statement was malformed or violated a constraint
    Statement {
        message: String,
        constraint_violation: bool,
    },
}

impl StoreError {
    /// Build a statement error from a SQLite failure
    pub fn statement(err: &rusqlite::Error) -> Self {
        let constraint_violation = matches!(
            err.sqlite_error_code(),
            Some(rusqlite::ErrorCode::ConstraintViolation)
        );
        StoreError::Statement {
            message: err.to_string(),
            constraint_violation,
        }
    }

    pub fn initialization(err: &anyhow::Error) -> Self {
        StoreError::Initialization(format!("{:#}", err))
    }

    pub fn persistence(err: &anyhow::Error) -> Self {
        StoreError::Persistence(format!("{:#}", err))
    }

    /// Whether this is a uniqueness, NOT NULL or other constraint failure
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            StoreError::Statement {
                constraint_violation: true,
                ..
            }
        )
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotInitialized => {
                write!(f, "Database not initialized, call initialize() first")
            }
            StoreError::Initialization(msg) => write!(f, "Failed to initialize database: {msg}"),
            StoreError::Persistence(msg) => write!(f, "Failed to persist snapshot: {msg}"),
            StoreError::Migration(msg) => write!(f, "Database migration failed: {msg}"),
            StoreError::Statement { message, .. } => write!(f, "Statement failed: {message}"),
        }
    }
}

impl std::error::Error for StoreError {}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_constraint_violation_detected() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE t (name TEXT UNIQUE)", []).unwrap();
        conn.execute("INSERT INTO t VALUES ('a')", []).unwrap();

        let err = conn.execute("INSERT INTO t VALUES ('a')", []).unwrap_err();
        assert!(StoreError::statement(&err).is_constraint_violation());

        let err = conn.execute("INSERT INTO nowhere VALUES (1)", []).unwrap_err();
        assert!(!StoreError::statement(&err).is_constraint_violation());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            StoreError::Persistence("quota exceeded".into()).to_string(),
            "Failed to persist snapshot: quota exceeded"
        );
    }
}
