//! Schemaforge-DB: Database collaborators for the migration manager
//!
//! This crate provides the SQLite side of schemaforge using rusqlite
//! with r2d2 connection pooling.
//!
//! # Modules
//!
//! - `pool` - Connection pool management
//! - `channel` - SQL execution channel handed to migration units
//! - `ledger` - Persistent record of applied migration versions
//! - `schema_cache` - Schema metadata cache invalidated after upgrades
//!
//! # Example
//!
//! ```no_run
//! use schemaforge_common::Version;
//! use schemaforge_db::ledger::{SqliteLedger, VersionLedger};
//! use schemaforge_db::pool::{get_conn, init_pool};
//!
//! let pool = init_pool("/var/lib/app/app.sqlite", 4).unwrap();
//! let conn = get_conn(&pool).unwrap();
//!
//! let ledger = SqliteLedger::open(&conn, "migration").unwrap();
//! let completed = ledger.completed_versions().unwrap();
//! println!("{} migrations applied", completed.len());
//! ```

pub mod channel;
pub mod ledger;
pub mod pool;
pub mod schema_cache;

pub use channel::SqlChannel;
pub use ledger::{AppliedVersion, SqliteLedger, VersionLedger};
pub use schema_cache::{CacheInvalidator, SchemaCache};
