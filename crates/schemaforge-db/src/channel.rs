//! SQL execution channel.
//!
//! Migration units never see a concrete connection type. They receive a
//! `&dyn SqlChannel`, which runs a statement (or a `;`-separated batch)
//! against the target database and reports success or a descriptive error.

use rusqlite::Connection;
use schemaforge_common::{Error, Result};

/// Runs SQL against the database being migrated.
pub trait SqlChannel {
    /// Execute a statement or batch of statements.
    fn execute(&self, statement: &str) -> Result<()>;
}

impl SqlChannel for Connection {
    fn execute(&self, statement: &str) -> Result<()> {
        tracing::trace!(statement = %preview(statement), "executing migration SQL");
        self.execute_batch(statement)
            .map_err(|e| Error::database(e.to_string()))
    }
}

/// First line of a statement, for log output.
fn preview(statement: &str) -> &str {
    statement
        .trim_start()
        .lines()
        .next()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_batch() {
        let conn = Connection::open_in_memory().unwrap();
        let channel: &dyn SqlChannel = &conn;

        channel
            .execute(
                "CREATE TABLE resource (id INTEGER PRIMARY KEY);
                 ALTER TABLE resource ADD COLUMN text TEXT DEFAULT NULL;",
            )
            .unwrap();

        let columns: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('resource')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(columns, 2);
    }

    #[test]
    fn test_execute_reports_database_error() {
        let conn = Connection::open_in_memory().unwrap();
        let channel: &dyn SqlChannel = &conn;

        let err = channel
            .execute("ALTER TABLE missing ADD COLUMN text TEXT")
            .unwrap_err();
        assert!(matches!(err, Error::Database(_)));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("\n  CREATE TABLE a (id INT);\nCREATE TABLE b (id INT);"), "CREATE TABLE a (id INT);");
        assert_eq!(preview(""), "");
    }
}
