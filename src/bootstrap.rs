//! Application bootstrap for schema migrations.
//!
//! [`Migrator`] wires the configuration to the collaborators the migration
//! manager needs: a pooled SQLite connection that serves as both the unit
//! channel and the ledger store, the built-in unit registry, and the schema
//! metadata cache. Every operation borrows one connection for its duration.
//!
//! [`Migrator::inspect`] opens the database for reading only. It never creates
//! the database file or the ledger table.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use schemaforge_common::Version;
use schemaforge_db::pool::{get_conn, init_memory_pool, init_pool, init_read_only_pool, DbPool};
use schemaforge_db::schema_cache::SchemaSnapshot;
use schemaforge_db::{SchemaCache, SqliteLedger};
use schemaforge_migrate::{
    MigrationManager, MigrationResult, MigrationStatus, UnitDescriptor, UnitDiscovery,
    UnitRegistry, UpgradeReport,
};

use crate::config::Config;
use crate::units;

pub struct Migrator {
    config: Config,
    pool: DbPool,
    registry: UnitRegistry,
    cache: SchemaCache,
    stop_signal: Arc<AtomicBool>,
    read_only: bool,
}

impl Migrator {
    /// Open the configured database file, creating it if needed.
    pub fn open(config: Config) -> Result<Self> {
        let db_path = config.database.path.to_string_lossy().into_owned();
        tracing::info!("Opening database at {}", db_path);
        let pool = init_pool(&db_path, config.database.pool_size)
            .with_context(|| format!("Failed to open database: {}", db_path))?;
        Self::with_pool(config, pool)
    }

    /// Open the configured database for inspection only.
    ///
    /// A missing database file reads as an empty, unmigrated database.
    /// Operations that write (`upgrade`, `mark_all_as_completed`) fail.
    pub fn inspect(config: Config) -> Result<Self> {
        let db_path = config.database.path.to_string_lossy().into_owned();
        let pool = if config.database.path.exists() {
            tracing::debug!("Opening database at {} read-only", db_path);
            init_read_only_pool(&db_path, config.database.pool_size)
                .with_context(|| format!("Failed to open database: {}", db_path))?
        } else {
            tracing::debug!("Database {} does not exist yet", db_path);
            init_memory_pool()?
        };

        let mut migrator = Self::with_pool(config, pool)?;
        migrator.read_only = true;
        Ok(migrator)
    }

    /// Use an existing pool, e.g. an in-memory one.
    pub fn with_pool(config: Config, pool: DbPool) -> Result<Self> {
        let registry = units::registry(
            &config.migrations.namespace,
            config.migrations.sql_scripts,
        )
        .context("Failed to register built-in migration units")?;

        Ok(Self {
            config,
            pool,
            registry,
            cache: SchemaCache::new(),
            stop_signal: Arc::new(AtomicBool::new(false)),
            read_only: false,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Stop signal shared by every pass this migrator runs.
    ///
    /// Once set, passes stop before their next unit until it is cleared.
    pub fn stop_signal(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop_signal)
    }

    /// Run one migration pass.
    pub fn upgrade(&self) -> Result<UpgradeReport> {
        self.ensure_writable()?;
        self.with_manager(|manager| manager.upgrade())
            .context("Migration pass failed")
    }

    /// Units the next pass would apply, in order.
    pub fn pending(&self) -> Result<Vec<UnitDescriptor>> {
        self.with_manager(|manager| manager.migrations_to_perform())
            .context("Failed to list pending migrations")
    }

    pub fn status(&self) -> Result<MigrationStatus> {
        self.with_manager(|manager| manager.status())
            .context("Failed to read migration status")
    }

    /// Record every pending unit as applied without running it.
    pub fn mark_all_as_completed(&self) -> Result<Vec<Version>> {
        self.ensure_writable()?;
        self.with_manager(|manager| manager.mark_all_as_completed())
            .context("Failed to mark migrations as completed")
    }

    /// Current schema metadata, reloaded after any upgrade that changed it.
    pub fn schema(&self) -> Result<Arc<SchemaSnapshot>> {
        let conn = get_conn(&self.pool)?;
        Ok(self.cache.snapshot(&conn)?)
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.read_only {
            anyhow::bail!(
                "Database {} was opened for inspection only",
                self.config.database.path.display()
            );
        }
        Ok(())
    }

    fn with_manager<T>(
        &self,
        run: impl FnOnce(&MigrationManager<'_>) -> MigrationResult<T>,
    ) -> Result<T> {
        let settings = &self.config.migrations;
        let conn = get_conn(&self.pool)?;
        let ledger = if self.read_only {
            SqliteLedger::existing(&conn, &settings.table)
        } else {
            SqliteLedger::open(&conn, &settings.table)
        }
        .with_context(|| format!("Failed to open ledger table {}", settings.table))?;

        let discovery = UnitDiscovery::new(settings.path.clone(), settings.namespace.clone())
            .with_extensions(&settings.extensions)
            .strict_versions(settings.strict_versions);

        let manager = MigrationManager::new(discovery, &*conn, &ledger, &self.registry)
            .with_invalidator(&self.cache)
            .with_invalidation_policy(settings.invalidate_cache)
            .with_stop_signal(Arc::clone(&self.stop_signal));

        Ok(run(&manager)?)
    }
}
