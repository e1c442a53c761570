mod cli;

use schemaforge::{config, units, Config, Migrator};
use schemaforge_migrate::{MigrationStatus, UnitDiscovery};

use anyhow::Result;
use chrono::SecondsFormat;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "schemaforge=debug,schemaforge_migrate=debug,schemaforge_db=trace,schemaforge_common=debug"
                .to_string()
        } else {
            "schemaforge=info,schemaforge_migrate=info,schemaforge_db=warn".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Upgrade { dry_run } => {
            let config = load(cli.config.as_deref(), cli.database)?;
            upgrade(config, dry_run)
        }
        Commands::Status { json } => {
            let config = load(cli.config.as_deref(), cli.database)?;
            status(config, json)
        }
        Commands::MarkCompleted => {
            let config = load(cli.config.as_deref(), cli.database)?;
            mark_completed(config)
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Init { path, force } => init_config(&path, force),
        Commands::Version => {
            println!("schemaforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn load(config_path: Option<&Path>, database: Option<PathBuf>) -> Result<Config> {
    let mut config = config::load_config_or_default(config_path)?;
    if let Some(database) = database {
        config.database.path = database;
    }
    Ok(config)
}

fn upgrade(config: Config, dry_run: bool) -> Result<()> {
    if dry_run {
        let pending = Migrator::inspect(config)?.pending()?;
        if pending.is_empty() {
            println!("Database schema is up to date");
        } else {
            println!("[DRY RUN] Would apply {} migration(s):", pending.len());
            for unit in &pending {
                println!("  {}  {}", unit.version, unit.symbol);
            }
        }
        return Ok(());
    }

    let report = Migrator::open(config)?.upgrade()?;
    if report.applied.is_empty() {
        println!("Database schema is up to date");
    } else {
        println!("Applied {} migration(s):", report.applied.len());
        for version in &report.applied {
            println!("  {}", version);
        }
    }
    Ok(())
}

fn status(config: Config, json: bool) -> Result<()> {
    let migrator = Migrator::inspect(config)?;
    let status = migrator.status()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print_status(&status);
    }
    Ok(())
}

fn print_status(status: &MigrationStatus) {
    if status.units.is_empty() {
        println!("No migrations found");
    }
    for entry in &status.units {
        let marker = if entry.applied { "applied" } else { "pending" };
        match entry.applied_at {
            Some(at) => println!(
                "{:<8} {}  {}  ({})",
                marker,
                entry.unit.version,
                entry.unit.symbol,
                at.to_rfc3339_opts(SecondsFormat::Secs, true)
            ),
            None => println!("{:<8} {}  {}", marker, entry.unit.version, entry.unit.symbol),
        }
    }
    for version in &status.orphaned {
        println!("{:<8} {}  (no unit file)", "orphaned", version);
    }

    let pending = status.pending().count();
    println!();
    if pending == 0 {
        println!("Database schema is up to date");
    } else {
        println!("{} pending migration(s)", pending);
    }
}

fn mark_completed(config: Config) -> Result<()> {
    let migrator = Migrator::open(config)?;
    let recorded = migrator.mark_all_as_completed()?;
    if recorded.is_empty() {
        println!("No pending migrations");
    } else {
        println!("Marked {} migration(s) as completed", recorded.len());
    }
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            config::load_config(p)?
        }
        None => {
            println!("No config file specified, searching default locations");
            config::load_config_or_default(None)?
        }
    };

    let settings = &config.migrations;
    let found = UnitDiscovery::new(settings.path.clone(), settings.namespace.clone())
        .with_extensions(&settings.extensions)
        .strict_versions(settings.strict_versions)
        .scan()?;

    println!("✓ Configuration is valid");
    println!("  Database: {}", config.database.path.display());
    println!("  Migrations: {}", settings.path.display());
    println!("  Ledger table: {}", settings.table);
    println!("  Units found: {}", found.len());

    let registry = units::registry(&settings.namespace, settings.sql_scripts)?;
    println!("  Built-in units:");
    for symbol in registry.symbols() {
        println!("    {}", symbol);
    }
    Ok(())
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("Config file already exists: {:?} (use --force to overwrite)", path);
    }
    config::save_config(path, &Config::default())?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
