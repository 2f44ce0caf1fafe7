//! Migration runner and smoke probe for the metadata store.
//!
//! # Responsibility
//! - Load configuration and initialize logging for the selected environment.
//! - Apply, revert or report schema migrations on the configured database.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use datasphere_core::config::CONFIG_PATH_ENV;
use datasphere_core::db::connect;
use datasphere_core::db::migrations::{current_version, MigrationSet};
use datasphere_core::{init_logging, new_request_id, Config};
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "datasphere", version, about = "Chunked-file metadata store tooling")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, short, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Manage the database schema.
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Print the core crate version.
    Version,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum MigrateAction {
    /// Apply every pending migration.
    Up,
    /// Revert every applied migration.
    Down,
    /// Show applied and available schema versions.
    Status,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Version => {
            println!("datasphere_core version={}", datasphere_core::core_version());
            Ok(())
        }
        Command::Migrate { action } => {
            let path = cli
                .config
                .context("no config file given; pass --config or set CONFIG_PATH")?;
            let config = Config::load(&path)?;
            init_logging(config.env, config.logging.dir.as_deref())
                .map_err(anyhow::Error::msg)
                .context("failed to initialize logging")?;
            migrate(&config, action)
        }
    }
}

fn migrate(config: &Config, action: MigrateAction) -> Result<()> {
    let run_id = new_request_id();
    let migrations = match &config.database.migrations_path {
        Some(dir) => MigrationSet::from_dir(dir)?,
        None => MigrationSet::embedded(),
    };
    let mut conn = connect(&config.database.storage_path).with_context(|| {
        format!(
            "failed to open database {}",
            config.database.storage_path.display()
        )
    })?;

    match action {
        MigrateAction::Up => {
            let applied = migrations
                .apply(&mut conn)
                .context("failed to apply migrations")?;
            info!("event=migrate module=cli status=ok action=up run_id={run_id} applied={applied}");
            println!("applied {applied} migration(s)");
        }
        MigrateAction::Down => {
            let reverted = migrations
                .revert(&mut conn)
                .context("failed to revert migrations")?;
            info!(
                "event=migrate module=cli status=ok action=down run_id={run_id} reverted={reverted}"
            );
            println!("reverted {reverted} migration(s)");
        }
        MigrateAction::Status => {
            let current = current_version(&conn)?;
            println!("schema version {current} of {}", migrations.latest_version());
        }
    }

    Ok(())
}
