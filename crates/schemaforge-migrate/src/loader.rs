//! Unit loading.
//!
//! Discovery only knows file names. Turning a [`UnitDescriptor`] into a
//! runnable unit goes through a [`UnitLoader`]. The standard loader is the
//! [`UnitRegistry`]: constructors are registered by symbol name at startup,
//! and SQL files without a registered constructor can optionally be run as
//! plain scripts.

use std::collections::HashMap;

use tracing::debug;

use crate::discovery::UnitDescriptor;
use crate::error::{MigrationError, MigrationResult};
use crate::unit::{MigrationUnit, SqlScriptUnit};

/// Builds a fresh unit instance.
pub type UnitConstructor = fn() -> Box<dyn MigrationUnit>;

/// Materializes discovered units.
pub trait UnitLoader {
    /// Load the unit described by `descriptor`.
    ///
    /// Loading the same descriptor again must succeed and return an
    /// equivalent unit.
    fn load(&self, descriptor: &UnitDescriptor) -> MigrationResult<Box<dyn MigrationUnit>>;
}

/// Symbol-name to constructor table.
#[derive(Default)]
pub struct UnitRegistry {
    constructors: HashMap<String, UnitConstructor>,
    sql_scripts: bool,
}

fn construct_default<U: MigrationUnit + Default + 'static>() -> Box<dyn MigrationUnit> {
    Box::new(U::default())
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `.sql` units that have no registered constructor as scripts.
    pub fn with_sql_scripts(mut self, enabled: bool) -> Self {
        self.sql_scripts = enabled;
        self
    }

    /// Register `constructor` under `symbol`.
    ///
    /// Each symbol can be registered once.
    pub fn register<S: Into<String>>(
        &mut self,
        symbol: S,
        constructor: UnitConstructor,
    ) -> MigrationResult<&mut Self> {
        let symbol = symbol.into();
        if self.constructors.contains_key(&symbol) {
            return Err(MigrationError::Registration(format!(
                "{symbol} is already registered"
            )));
        }
        self.constructors.insert(symbol, constructor);
        Ok(self)
    }

    /// Register a unit type built with `Default::default()`.
    pub fn register_default<U: MigrationUnit + Default + 'static>(
        &mut self,
        symbol: &str,
    ) -> MigrationResult<&mut Self> {
        self.register(symbol, construct_default::<U>)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.constructors.contains_key(symbol)
    }

    /// Registered symbol names, sorted.
    pub fn symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        symbols.sort_unstable();
        symbols
    }

    fn not_found(descriptor: &UnitDescriptor, reason: impl Into<String>) -> MigrationError {
        MigrationError::UnitNotFound {
            symbol: descriptor.symbol.clone(),
            path: descriptor.location.clone(),
            reason: reason.into(),
        }
    }

    fn is_sql_file(descriptor: &UnitDescriptor) -> bool {
        descriptor
            .location
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"))
    }
}

impl UnitLoader for UnitRegistry {
    fn load(&self, descriptor: &UnitDescriptor) -> MigrationResult<Box<dyn MigrationUnit>> {
        if !descriptor.location.is_file() {
            return Err(Self::not_found(descriptor, "file does not exist"));
        }

        if let Some(constructor) = self.constructors.get(&descriptor.symbol) {
            debug!("Loaded registered unit {}", descriptor.symbol);
            return Ok(constructor());
        }

        if self.sql_scripts && Self::is_sql_file(descriptor) {
            let sql = std::fs::read_to_string(&descriptor.location)
                .map_err(|e| Self::not_found(descriptor, format!("cannot read script: {e}")))?;
            if sql.trim().is_empty() {
                return Err(Self::not_found(descriptor, "script is empty"));
            }
            debug!("Loaded SQL script unit {}", descriptor.location.display());
            return Ok(Box::new(SqlScriptUnit::new(sql)));
        }

        Err(Self::not_found(
            descriptor,
            "no unit is registered under this name",
        ))
    }
}
