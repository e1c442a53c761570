//! Database connection pool management.
//!
//! This module provides connection pooling for SQLite using r2d2.
//! It handles pool initialization and connection customization. Migrations
//! are not run here; the application bootstrap borrows one connection from
//! the pool and hands it to the migration manager.

use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use schemaforge_common::{Error, Result};

/// Type alias for the database connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Type alias for a pooled database connection.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Initialize a new database pool with the given file path.
///
/// This function will:
/// - Create the SQLite database file if it doesn't exist
/// - Set up connection pooling with r2d2
/// - Enable foreign key constraints on all connections
///
/// # Arguments
///
/// * `db_path` - Path to the SQLite database file
/// * `max_size` - Maximum number of pooled connections
///
/// # Example
///
/// ```no_run
/// use schemaforge_db::pool::init_pool;
///
/// let pool = init_pool("/var/lib/app/app.sqlite", 4).unwrap();
/// let conn = pool.get().unwrap();
/// ```
pub fn init_pool(db_path: &str, max_size: u32) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(db_path)
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));

    Pool::builder()
        .max_size(max_size)
        .build(manager)
        .map_err(|e| Error::database(format!("Failed to create connection pool: {}", e)))
}

/// Open an existing database file read-only.
///
/// Unlike [`init_pool`], this never creates the file; a missing file is an
/// error.
pub fn init_read_only_pool(db_path: &str, max_size: u32) -> Result<DbPool> {
    if !Path::new(db_path).is_file() {
        return Err(Error::database(format!(
            "Database file does not exist: {}",
            db_path
        )));
    }

    let manager = SqliteConnectionManager::file(db_path).with_flags(
        OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    );

    Pool::builder()
        .max_size(max_size)
        .build(manager)
        .map_err(|e| Error::database(format!("Failed to create read-only pool: {}", e)))
}

/// Initialize an in-memory database pool for testing.
///
/// Every SQLite in-memory connection is its own database, so the pool holds
/// a single connection. The database is lost when the pool is dropped.
///
/// # Example
///
/// ```
/// use schemaforge_db::pool::init_memory_pool;
///
/// let pool = init_memory_pool().unwrap();
/// let conn = pool.get().unwrap();
/// ```
pub fn init_memory_pool() -> Result<DbPool> {
    let manager = SqliteConnectionManager::memory()
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));

    Pool::builder()
        .max_size(1)
        .build(manager)
        .map_err(|e| Error::database(format!("Failed to create in-memory pool: {}", e)))
}

/// Get a connection from the pool.
///
/// This is a convenience wrapper around `pool.get()` that converts the
/// r2d2 error into our common Error type.
pub fn get_conn(pool: &DbPool) -> Result<PooledConnection> {
    pool.get()
        .map_err(|e| Error::database(format!("Failed to get connection from pool: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_memory_pool() {
        let pool = init_memory_pool().unwrap();
        assert_eq!(pool.max_size(), 1);
    }

    #[test]
    fn test_get_conn_enables_foreign_keys() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        let enabled: i32 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn test_read_only_pool_requires_file() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("missing.sqlite");

        let result = init_read_only_pool(&db_path.to_string_lossy(), 1);
        assert!(matches!(result, Err(Error::Database(_))));
        assert!(!db_path.exists());
    }

    #[test]
    fn test_read_only_pool_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("app.sqlite");
        init_pool(&db_path.to_string_lossy(), 1)
            .unwrap()
            .get()
            .unwrap()
            .execute_batch("CREATE TABLE resource (id INTEGER PRIMARY KEY);")
            .unwrap();

        let pool = init_read_only_pool(&db_path.to_string_lossy(), 1).unwrap();
        let conn = get_conn(&pool).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM resource", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
        assert!(conn
            .execute_batch("INSERT INTO resource (id) VALUES (1);")
            .is_err());
    }

    #[test]
    fn test_file_pool_shares_database() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("app.sqlite");
        let pool = init_pool(&db_path.to_string_lossy(), 2).unwrap();
        assert!(db_path.exists());

        {
            let conn = get_conn(&pool).unwrap();
            conn.execute_batch("CREATE TABLE resource (id INTEGER PRIMARY KEY);")
                .unwrap();
        }

        let conn = get_conn(&pool).unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='resource'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }
}
