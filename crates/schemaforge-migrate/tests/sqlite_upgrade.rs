//! End-to-end migration passes against a real SQLite database.

use std::fs;
use std::path::Path;

use assert_matches::assert_matches;
use rusqlite::Connection;
use schemaforge_common::Version;
use schemaforge_db::{SchemaCache, SqlChannel, SqliteLedger, VersionLedger};
use schemaforge_migrate::{
    MigrationError, MigrationManager, MigrationUnit, UnitDiscovery, UnitRegistry,
};

/// Unit compiled into the test binary, found through the registry.
#[derive(Default)]
struct AddResourceText;

impl MigrationUnit for AddResourceText {
    fn up(&self, channel: &dyn SqlChannel) -> schemaforge_common::Result<()> {
        channel.execute("ALTER TABLE resource ADD COLUMN text TEXT DEFAULT NULL;")?;
        channel.execute("CREATE INDEX IF NOT EXISTS idx_resource_text ON resource (text);")
    }
}

fn write_units(dir: &Path) {
    fs::write(
        dir.join("20190101000000_CreateResource.sql"),
        "CREATE TABLE resource (id INTEGER PRIMARY KEY, title TEXT NOT NULL);",
    )
    .unwrap();
    fs::write(dir.join("20190502053908_AddResourceText.rs"), "// compiled in\n").unwrap();
    fs::write(dir.join("README.md"), "# migrations\n").unwrap();
}

fn registry() -> UnitRegistry {
    let mut registry = UnitRegistry::new().with_sql_scripts(true);
    registry
        .register_default::<AddResourceText>("app::migrations::AddResourceText")
        .unwrap();
    registry
}

fn v(s: &str) -> Version {
    Version::parse(s).unwrap()
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> bool {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM pragma_table_info(?1) WHERE name = ?2",
        [table, column],
        |row| row.get(0),
    )
    .unwrap()
}

#[test]
fn upgrade_fresh_database() {
    let dir = tempfile::tempdir().unwrap();
    write_units(dir.path());
    let conn = Connection::open_in_memory().unwrap();
    let ledger = SqliteLedger::open(&conn, "migration").unwrap();
    let registry = registry();
    let cache = SchemaCache::new();

    let manager = MigrationManager::new(
        UnitDiscovery::new(dir.path(), "app::migrations").with_extensions(["sql", "rs"]),
        &conn,
        &ledger,
        &registry,
    )
    .with_invalidator(&cache);

    // Warm the cache so the invalidation is observable.
    assert!(!cache.snapshot(&conn).unwrap().has_table("resource"));

    let report = manager.upgrade().unwrap();
    assert_eq!(report.applied, vec![v("20190101000000"), v("20190502053908")]);
    assert!(report.cache_invalidated);
    assert_eq!(cache.invalidations(), 1);

    assert!(column_exists(&conn, "resource", "text"));
    assert!(cache.snapshot(&conn).unwrap().has_column("resource", "text"));

    let completed = ledger.completed_versions().unwrap();
    assert_eq!(completed.len(), 2);

    // Re-running is a no-op.
    let report = manager.upgrade().unwrap();
    assert!(report.applied.is_empty());
    assert!(!report.cache_invalidated);
    assert_eq!(cache.invalidations(), 1);
}

#[test]
fn upgrade_picks_up_new_units() {
    let dir = tempfile::tempdir().unwrap();
    write_units(dir.path());
    let conn = Connection::open_in_memory().unwrap();
    let ledger = SqliteLedger::open(&conn, "migration").unwrap();
    let registry = registry();

    let manager = MigrationManager::new(
        UnitDiscovery::new(dir.path(), "app::migrations"),
        &conn,
        &ledger,
        &registry,
    );
    manager.upgrade().unwrap();

    fs::write(
        dir.path().join("20200115093000_CreateItemSet.sql"),
        "CREATE TABLE item_set (id INTEGER PRIMARY KEY, resource_id INTEGER REFERENCES resource(id));",
    )
    .unwrap();

    let report = manager.upgrade().unwrap();
    assert_eq!(report.applied, vec![v("20200115093000")]);
    assert_eq!(ledger.applied().unwrap().len(), 3);
}

#[test]
fn failing_unit_is_not_recorded() {
    let dir = tempfile::tempdir().unwrap();
    write_units(dir.path());
    fs::write(
        dir.path().join("20190301000000_Broken.sql"),
        "ALTER TABLE missing_table ADD COLUMN x TEXT;",
    )
    .unwrap();

    let conn = Connection::open_in_memory().unwrap();
    let ledger = SqliteLedger::open(&conn, "migration").unwrap();
    let registry = registry();
    let cache = SchemaCache::new();

    let manager = MigrationManager::new(
        UnitDiscovery::new(dir.path(), "app::migrations"),
        &conn,
        &ledger,
        &registry,
    )
    .with_invalidator(&cache);

    let err = manager.upgrade().unwrap_err();
    assert_matches!(err, MigrationError::Apply { ref version, .. } if *version == v("20190301000000"));

    let completed = ledger.completed_versions().unwrap();
    assert_eq!(completed.into_iter().collect::<Vec<_>>(), vec![v("20190101000000")]);
    // The unit after the failure never ran.
    assert!(!column_exists(&conn, "resource", "text"));
    assert_eq!(cache.invalidations(), 0);
}

#[test]
fn unregistered_rust_unit_fails_to_load() {
    let dir = tempfile::tempdir().unwrap();
    write_units(dir.path());
    let conn = Connection::open_in_memory().unwrap();
    let ledger = SqliteLedger::open(&conn, "migration").unwrap();
    let registry = UnitRegistry::new().with_sql_scripts(true);

    let manager = MigrationManager::new(
        UnitDiscovery::new(dir.path(), "app::migrations"),
        &conn,
        &ledger,
        &registry,
    );

    let err = manager.upgrade().unwrap_err();
    assert_matches!(
        err,
        MigrationError::UnitNotFound { ref symbol, .. } if symbol == "app::migrations::AddResourceText"
    );
    assert_eq!(ledger.completed_versions().unwrap().len(), 1);
}

#[test]
fn mark_all_as_completed_skips_execution() {
    let dir = tempfile::tempdir().unwrap();
    write_units(dir.path());
    let conn = Connection::open_in_memory().unwrap();
    let ledger = SqliteLedger::open(&conn, "migration").unwrap();
    let registry = registry();

    let manager = MigrationManager::new(
        UnitDiscovery::new(dir.path(), "app::migrations"),
        &conn,
        &ledger,
        &registry,
    );
    let recorded = manager.mark_all_as_completed().unwrap();
    assert_eq!(recorded.len(), 2);

    let tables: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='resource'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(tables, 0);

    let status = manager.status().unwrap();
    assert!(status.is_up_to_date());
    let recorded_at = ledger.applied().unwrap();
    for (unit, row) in status.units.iter().zip(&recorded_at) {
        assert_eq!(unit.unit.version, row.version);
        assert_eq!(unit.applied_at, Some(row.applied_at));
    }
}
