//! Schemaforge-Migrate: forward-only schema migrations.
//!
//! Units are files named `<version>_<SymbolSuffix>.<ext>` in one directory.
//! [`UnitDiscovery`] finds them, a [`UnitLoader`] turns each pending one into
//! a runnable [`MigrationUnit`], and the [`MigrationManager`] applies them in
//! version order, recording each success in a
//! [`VersionLedger`](schemaforge_db::VersionLedger).
//!
//! # Example
//!
//! ```no_run
//! use schemaforge_db::{SchemaCache, SqliteLedger};
//! use schemaforge_migrate::{MigrationManager, UnitDiscovery, UnitRegistry};
//!
//! let conn = rusqlite::Connection::open("app.sqlite").unwrap();
//! let ledger = SqliteLedger::open(&conn, "migration").unwrap();
//! let registry = UnitRegistry::new().with_sql_scripts(true);
//! let cache = SchemaCache::new();
//!
//! let manager = MigrationManager::new(
//!     UnitDiscovery::new("data/migrations", "app::migrations"),
//!     &conn,
//!     &ledger,
//!     &registry,
//! )
//! .with_invalidator(&cache);
//!
//! let report = manager.upgrade().unwrap();
//! println!("applied {} migration(s)", report.applied.len());
//! ```

pub mod discovery;
pub mod error;
pub mod loader;
pub mod manager;
pub mod unit;

pub use discovery::{UnitDescriptor, UnitDiscovery};
pub use error::{MigrationError, MigrationResult};
pub use loader::{UnitConstructor, UnitLoader, UnitRegistry};
pub use manager::{InvalidationPolicy, MigrationManager, MigrationStatus, UnitStatus, UpgradeReport};
pub use unit::{MigrationUnit, SqlScriptUnit};
