//! The migration unit capability.
//!
//! A unit advances the schema by one version. It has no rollback path. If a
//! pass is interrupted after a unit ran but before its version was recorded,
//! the unit runs again on the next pass, so units must either be safe to
//! re-run from scratch or guard their own DDL.

use schemaforge_common::Result;
use schemaforge_db::SqlChannel;

/// Forward-only schema change.
pub trait MigrationUnit {
    /// Apply this unit's changes through `channel`.
    fn up(&self, channel: &dyn SqlChannel) -> Result<()>;
}

/// A unit whose forward operation is a single SQL batch read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlScriptUnit {
    sql: String,
}

impl SqlScriptUnit {
    pub fn new<S: Into<String>>(sql: S) -> Self {
        Self { sql: sql.into() }
    }
}

impl MigrationUnit for SqlScriptUnit {
    fn up(&self, channel: &dyn SqlChannel) -> Result<()> {
        channel.execute(&self.sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_sql_script_unit_runs_batch() {
        let conn = Connection::open_in_memory().unwrap();
        let unit = SqlScriptUnit::new(
            "CREATE TABLE resource (id INTEGER PRIMARY KEY);
             CREATE INDEX idx_resource_id ON resource (id);",
        );

        unit.up(&conn).unwrap();

        let indexes: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name='idx_resource_id'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(indexes, 1);
    }

    #[test]
    fn test_sql_script_unit_propagates_failure() {
        let conn = Connection::open_in_memory().unwrap();
        let unit = SqlScriptUnit::new("ALTER TABLE resource ADD COLUMN text TEXT;");
        assert!(unit.up(&conn).is_err());
    }
}
