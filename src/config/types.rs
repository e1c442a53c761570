use schemaforge_migrate::InvalidationPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::units;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub migrations: MigrationsConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// SQLite database file
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    /// Maximum pooled connections (default: 4)
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("schemaforge.db")
}
fn default_pool_size() -> u32 {
    4
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            pool_size: default_pool_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MigrationsConfig {
    /// Directory holding `<version>_<Name>.<ext>` unit files
    #[serde(default = "default_migrations_path")]
    pub path: PathBuf,

    /// Prefix for the symbol names units are registered under
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Ledger table recording applied versions
    #[serde(default = "default_table")]
    pub table: String,

    /// Unit file extensions to recognize (empty = any)
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Run `.sql` units that have no compiled-in implementation as scripts
    #[serde(default = "default_true")]
    pub sql_scripts: bool,

    /// Reject version identifiers of differing widths instead of warning
    #[serde(default = "default_true")]
    pub strict_versions: bool,

    /// When to invalidate the schema metadata cache (`when-pending` or `always`)
    #[serde(default)]
    pub invalidate_cache: InvalidationPolicy,
}

fn default_migrations_path() -> PathBuf {
    PathBuf::from("data/migrations")
}
fn default_namespace() -> String {
    units::NAMESPACE.to_string()
}
fn default_table() -> String {
    schemaforge_db::ledger::DEFAULT_LEDGER_TABLE.to_string()
}
fn default_extensions() -> Vec<String> {
    vec!["rs".to_string(), "sql".to_string()]
}
fn default_true() -> bool {
    true
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            path: default_migrations_path(),
            namespace: default_namespace(),
            table: default_table(),
            extensions: default_extensions(),
            sql_scripts: true,
            strict_versions: true,
            invalidate_cache: InvalidationPolicy::default(),
        }
    }
}
