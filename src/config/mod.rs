mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
///
/// Relative database and migration paths are resolved against the directory
/// containing the config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    if let Some(base) = path.parent() {
        resolve_paths(&mut config, base);
    }

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./schemaforge.toml",
        "./config.toml",
        "~/.config/schemaforge/config.toml",
        "/etc/schemaforge/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Write `config` to `path` as TOML
pub fn save_config(path: &Path, config: &Config) -> Result<()> {
    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;
    Ok(())
}

fn resolve_paths(config: &mut Config, base: &Path) {
    if config.database.path.is_relative() {
        config.database.path = base.join(&config.database.path);
    }
    if config.migrations.path.is_relative() {
        config.migrations.path = base.join(&config.migrations.path);
    }
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.database.pool_size == 0 {
        anyhow::bail!("Database pool_size cannot be 0");
    }

    if config.database.path.as_os_str().is_empty() {
        anyhow::bail!("Database path cannot be empty");
    }

    if config.migrations.path.as_os_str().is_empty() {
        anyhow::bail!("Migrations path cannot be empty");
    }

    schemaforge_db::ledger::validate_table_name(&config.migrations.table)?;

    if !config.migrations.path.is_dir() {
        tracing::warn!(
            "Migrations directory does not exist: {:?}",
            config.migrations.path
        );
    }

    Ok(())
}
