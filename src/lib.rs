//! Schemaforge - ledger-tracked schema migrations
//!
//! This library crate exposes configuration loading, the built-in migration
//! units, and the bootstrap helper used by the CLI and by integration tests.

pub mod bootstrap;
pub mod config;
pub mod units;

pub use bootstrap::Migrator;
pub use config::Config;
