//! Version ledger.
//!
//! The ledger is a single table holding one row per applied migration
//! version. From the migration manager's point of view it is append-only:
//! versions are read as a set and inserted one at a time, never updated or
//! deleted.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use schemaforge_common::{Error, Result, Version};
use serde::Serialize;

/// Table name used when none is configured.
pub const DEFAULT_LEDGER_TABLE: &str = "migration";

/// Read/append access to the set of applied versions.
pub trait VersionLedger {
    /// All versions recorded so far. No ordering is implied.
    fn completed_versions(&self) -> Result<BTreeSet<Version>>;

    /// Insert exactly one record for `version`.
    ///
    /// Recording a version that is already present is an error.
    fn record_version(&self, version: &Version) -> Result<()>;

    /// When each recorded version was applied, for ledgers that keep a
    /// timestamp. Versions without one are left out.
    fn applied_times(&self) -> Result<BTreeMap<Version, DateTime<Utc>>> {
        Ok(BTreeMap::new())
    }
}

/// A ledger row with its application timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedVersion {
    pub version: Version,
    pub applied_at: DateTime<Utc>,
}

/// Ledger stored in a SQLite table on the migrated database.
pub struct SqliteLedger<'c> {
    conn: &'c Connection,
    table: String,
    present: bool,
}

impl<'c> SqliteLedger<'c> {
    /// Open the ledger in `table`, creating the table if it doesn't exist.
    pub fn open(conn: &'c Connection, table: &str) -> Result<Self> {
        validate_table_name(table)?;
        let ledger = Self {
            conn,
            table: table.to_string(),
            present: true,
        };
        ledger.ensure_table()?;
        Ok(ledger)
    }

    /// Open the ledger without creating its table.
    ///
    /// A missing table reads as an empty ledger and rejects writes, so
    /// nothing is changed on the database.
    pub fn existing(conn: &'c Connection, table: &str) -> Result<Self> {
        validate_table_name(table)?;
        let present = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |row| row.get(0),
            )
            .map_err(|e| Error::database(format!("Failed to look up ledger table {table}: {e}")))?;
        Ok(Self {
            conn,
            table: table.to_string(),
            present,
        })
    }

    /// Name of the backing table.
    pub fn table(&self) -> &str {
        &self.table
    }

    fn ensure_table(&self) -> Result<()> {
        self.conn
            .execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS \"{}\" (
                    version    TEXT PRIMARY KEY NOT NULL,
                    applied_at TEXT NOT NULL
                )",
                self.table
            ))
            .map_err(|e| {
                Error::database(format!("Failed to create ledger table {}: {e}", self.table))
            })
    }

    /// Whether the backing table exists.
    pub fn is_present(&self) -> bool {
        self.present
    }

    /// Every ledger row, ordered by version.
    pub fn applied(&self) -> Result<Vec<AppliedVersion>> {
        if !self.present {
            return Ok(Vec::new());
        }
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT version, applied_at FROM \"{}\" ORDER BY version",
                self.table
            ))
            .map_err(|e| Error::database(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| Error::database(e.to_string()))?;

        let mut applied = Vec::new();
        for row in rows {
            let (version, applied_at) = row.map_err(|e| Error::database(e.to_string()))?;
            let applied_at = DateTime::parse_from_rfc3339(&applied_at)
                .map_err(|e| {
                    Error::database(format!("Bad applied_at for version {version}: {e}"))
                })?
                .with_timezone(&Utc);
            applied.push(AppliedVersion {
                version: parse_stored_version(version)?,
                applied_at,
            });
        }
        Ok(applied)
    }
}

impl VersionLedger for SqliteLedger<'_> {
    fn completed_versions(&self) -> Result<BTreeSet<Version>> {
        if !self.present {
            return Ok(BTreeSet::new());
        }
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT version FROM \"{}\"", self.table))
            .map_err(|e| Error::database(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| Error::database(e.to_string()))?;

        let mut versions = BTreeSet::new();
        for row in rows {
            let version = row.map_err(|e| Error::database(e.to_string()))?;
            versions.insert(parse_stored_version(version)?);
        }
        Ok(versions)
    }

    fn record_version(&self, version: &Version) -> Result<()> {
        if !self.present {
            return Err(Error::database(format!(
                "Failed to record version {version}: ledger table {} does not exist",
                self.table
            )));
        }
        self.conn
            .execute(
                &format!(
                    "INSERT INTO \"{}\" (version, applied_at) VALUES (?1, ?2)",
                    self.table
                ),
                rusqlite::params![version.as_str(), Utc::now().to_rfc3339()],
            )
            .map_err(|e| {
                Error::database(format!("Failed to record version {version}: {e}"))
            })?;
        Ok(())
    }

    fn applied_times(&self) -> Result<BTreeMap<Version, DateTime<Utc>>> {
        Ok(self
            .applied()?
            .into_iter()
            .map(|row| (row.version, row.applied_at))
            .collect())
    }
}

fn parse_stored_version(raw: String) -> Result<Version> {
    Version::parse(raw.as_str())
        .map_err(|e| Error::database(format!("Ledger holds an invalid version {raw:?}: {e}")))
}

/// Ledger table names are interpolated into SQL, so only plain identifiers
/// are accepted.
pub fn validate_table_name(table: &str) -> Result<()> {
    let mut chars = table.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(Error::invalid_input(format!(
            "Invalid ledger table name: {table:?}"
        )))
    }
}
