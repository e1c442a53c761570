//! Migration units compiled into the binary.
//!
//! Unit sources live next to the SQL units in `data/migrations/`, so the
//! directory listing stays the single source of truth for what exists and in
//! which order. Discovery finds the file; the registry built here supplies
//! the implementation for its symbol name. SQL units need no entry.

use schemaforge_migrate::discovery::symbol_name;
use schemaforge_migrate::{MigrationResult, UnitRegistry};

#[path = "../../data/migrations/20190502053908_AddResourceText.rs"]
mod add_resource_text;

pub use add_resource_text::AddResourceText;

/// Default namespace for built-in unit symbols.
pub const NAMESPACE: &str = "schemaforge::migrations";

/// Registry holding every built-in unit under `namespace`.
pub fn registry(namespace: &str, sql_scripts: bool) -> MigrationResult<UnitRegistry> {
    let mut registry = UnitRegistry::new().with_sql_scripts(sql_scripts);
    registry.register_default::<AddResourceText>(&symbol_name(namespace, "AddResourceText"))?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;
    use schemaforge_db::SqlChannel;
    use schemaforge_common::Error;
    use schemaforge_migrate::MigrationUnit;
    use std::cell::RefCell;

    const CREATE_RESOURCE: &str =
        include_str!("../../data/migrations/20190101000000_CreateResource.sql");

    fn has_column(conn: &Connection, column: &str) -> bool {
        conn.query_row(
            "SELECT COUNT(*) > 0 FROM pragma_table_info('resource') WHERE name = ?1",
            [column],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_registry_contains_builtins() {
        let builtin = registry(NAMESPACE, true).unwrap();
        assert!(builtin.contains("schemaforge::migrations::AddResourceText"));

        let custom = registry("app", false).unwrap();
        assert!(custom.contains("app::AddResourceText"));
        assert!(!custom.contains("schemaforge::migrations::AddResourceText"));
    }

    #[test]
    fn test_add_resource_text_backfills() {
        let conn = Connection::open_in_memory().unwrap();
        SqlChannel::execute(&conn, CREATE_RESOURCE).unwrap();
        conn.execute(
            "INSERT INTO resource (resource_type, title, created) VALUES ('item', 'Map of Lisbon', '2019-05-01')",
            [],
        )
        .unwrap();

        AddResourceText.up(&conn).unwrap();

        assert!(has_column(&conn, "text"));
        let text: String = conn
            .query_row("SELECT text FROM resource", [], |row| row.get(0))
            .unwrap();
        assert_eq!(text, "Map of Lisbon");
    }

    #[test]
    fn test_add_resource_text_rolls_back() {
        let conn = Connection::open_in_memory().unwrap();
        SqlChannel::execute(&conn, CREATE_RESOURCE).unwrap();
        // The index name is taken by a table, so the second statement fails.
        conn.execute_batch("CREATE TABLE idx_resource_text (id INTEGER);")
            .unwrap();

        assert!(AddResourceText.up(&conn).is_err());
        assert!(!has_column(&conn, "text"));
        assert!(conn.is_autocommit());
    }

    /// Accepts `BEGIN` and fails every other statement.
    struct BrokenChannel {
        statements: RefCell<Vec<String>>,
    }

    impl SqlChannel for BrokenChannel {
        fn execute(&self, statement: &str) -> schemaforge_common::Result<()> {
            self.statements.borrow_mut().push(statement.trim().to_string());
            if statement == "BEGIN" {
                Ok(())
            } else {
                Err(Error::database(format!("refused: {}", statement.trim())))
            }
        }
    }

    #[test]
    fn test_add_resource_text_keeps_change_error_when_rollback_fails() {
        let channel = BrokenChannel {
            statements: RefCell::new(Vec::new()),
        };

        let err = AddResourceText.up(&channel).unwrap_err();
        assert!(err.to_string().contains("ALTER TABLE resource"));

        let statements = channel.statements.borrow();
        assert_eq!(statements.len(), 3);
        assert_eq!(statements[2], "ROLLBACK");
    }
}
