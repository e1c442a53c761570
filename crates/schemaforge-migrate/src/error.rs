//! Migration error types.
//!
//! Every failure aborts the whole pass and is returned to the caller as-is.
//! Nothing at this layer retries.

use std::path::PathBuf;

use schemaforge_common::{Error, Version};

/// Errors raised while discovering, loading, applying, or recording migrations.
#[derive(thiserror::Error, Debug)]
pub enum MigrationError {
    /// The migration directory could not be scanned, or its contents are
    /// inconsistent (duplicate versions, mixed version widths in strict mode).
    #[error("Migration discovery failed for {}: {reason}", path.display())]
    Discovery { path: PathBuf, reason: String },

    /// A pending unit could not be loaded, or nothing is registered under
    /// its expected symbol name.
    #[error("Migration unit {symbol} not found at {}: {reason}", path.display())]
    UnitNotFound {
        symbol: String,
        path: PathBuf,
        reason: String,
    },

    /// A unit's forward operation failed. The version was not recorded.
    #[error("Migration {version} failed: {source}")]
    Apply {
        version: Version,
        #[source]
        source: Error,
    },

    /// The set of completed versions could not be read.
    #[error("Failed to read the migration ledger: {0}")]
    LedgerRead(#[source] Error),

    /// The unit was applied but the ledger rejected its record.
    #[error("Migration {version} was applied but could not be recorded: {source}")]
    LedgerWrite {
        version: Version,
        #[source]
        source: Error,
    },

    /// The stop signal was raised between two units.
    #[error("Migration pass cancelled before {next}; {remaining} unit(s) not applied")]
    Cancelled { next: Version, remaining: usize },

    /// A unit registration was rejected.
    #[error("Invalid migration registration: {0}")]
    Registration(String),
}

impl MigrationError {
    pub(crate) fn discovery<P: Into<PathBuf>, S: Into<String>>(path: P, reason: S) -> Self {
        Self::Discovery {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for [`MigrationError`].
pub type MigrationResult<T> = Result<T, MigrationError>;
