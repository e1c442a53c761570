//! Schema metadata cache.
//!
//! Application code that maps rows onto types wants to know which tables and
//! columns exist without querying `sqlite_master` on every request. The
//! [`SchemaCache`] loads that metadata lazily and keeps it until told the
//! schema may have changed. The migration manager sends that signal through
//! [`CacheInvalidator`] after an upgrade.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rusqlite::Connection;
use schemaforge_common::{Error, Result};

/// Receives the "schema-derived metadata may be stale" notification.
pub trait CacheInvalidator {
    fn invalidate(&self);
}

/// Tables and their column names, as seen when the snapshot was taken.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaSnapshot {
    pub tables: BTreeMap<String, Vec<String>>,
}

impl SchemaSnapshot {
    /// Read table and column names from the database.
    pub fn load(conn: &Connection) -> Result<Self> {
        let mut stmt = conn
            .prepare(
                "SELECT name FROM sqlite_master
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
                 ORDER BY name",
            )
            .map_err(|e| Error::database(e.to_string()))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| Error::database(e.to_string()))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::database(e.to_string()))?;

        let mut tables = BTreeMap::new();
        for name in names {
            let mut stmt = conn
                .prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")
                .map_err(|e| Error::database(e.to_string()))?;
            let columns = stmt
                .query_map([&name], |row| row.get::<_, String>(0))
                .map_err(|e| Error::database(e.to_string()))?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| Error::database(e.to_string()))?;
            tables.insert(name, columns);
        }

        Ok(Self { tables })
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.tables
            .get(table)
            .is_some_and(|columns| columns.iter().any(|c| c == column))
    }
}

/// Lazily loaded, invalidatable schema metadata.
#[derive(Default)]
pub struct SchemaCache {
    snapshot: RwLock<Option<Arc<SchemaSnapshot>>>,
    invalidations: AtomicU64,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached snapshot, loading it from `conn` if the cache is empty.
    pub fn snapshot(&self, conn: &Connection) -> Result<Arc<SchemaSnapshot>> {
        if let Some(snapshot) = self.snapshot.read().as_ref() {
            return Ok(Arc::clone(snapshot));
        }

        let mut slot = self.snapshot.write();
        if let Some(snapshot) = slot.as_ref() {
            return Ok(Arc::clone(snapshot));
        }
        let snapshot = Arc::new(SchemaSnapshot::load(conn)?);
        tracing::debug!(tables = snapshot.tables.len(), "schema metadata cached");
        *slot = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot.read().is_some()
    }

    /// How many times the cache has been invalidated.
    pub fn invalidations(&self) -> u64 {
        self.invalidations.load(Ordering::Relaxed)
    }
}

impl CacheInvalidator for SchemaCache {
    fn invalidate(&self) {
        self.snapshot.write().take();
        self.invalidations.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("schema metadata cache invalidated");
    }
}
