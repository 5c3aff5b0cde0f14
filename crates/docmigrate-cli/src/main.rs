mod console;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use docmigrate_common::SchemaDelta;
use docmigrate_config::{DatabaseConfig, DeltaLoader};
use docmigrate_db::{MigrationReport, MigrationRunner, MySqlBackend, SchemaBackend, SqliteBackend};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Add missing columns and indexes to a table, checking the catalog first so
/// the run can be repeated safely.
#[derive(Parser, Debug)]
#[command(name = "docmigrate", version, about)]
struct Cli {
    /// Migrate a SQLite database file instead of the MySQL server from DB_* variables
    #[arg(long, value_name = "PATH")]
    sqlite: Option<PathBuf>,

    /// Load the desired columns and indexes from a TOML or YAML file
    #[arg(long, value_name = "FILE")]
    delta: Option<PathBuf>,

    /// Report what is missing without changing the schema
    #[arg(long)]
    dry_run: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli).await {
        Ok(report) => {
            console::print_success(&report, cli.dry_run);
            ExitCode::SUCCESS
        }
        Err(e) => {
            console::print_failure(&e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: &Cli) -> Result<MigrationReport> {
    let delta = match &cli.delta {
        Some(path) => DeltaLoader::load(path)
            .with_context(|| format!("failed to load delta from {}", path.display()))?,
        None => {
            let delta = SchemaDelta::application_documents();
            delta.validate().context("invalid schema delta")?;
            delta
        }
    };

    console::print_header(&delta, cli.dry_run);

    if let Some(path) = &cli.sqlite {
        println!("Opening {}", path.display());
        let backend = SqliteBackend::open(path)?;
        return migrate(backend, &delta, cli.dry_run).await;
    }

    let config = DatabaseConfig::from_env().context("invalid database configuration")?;
    info!(?config, "loaded configuration");
    console::print_target(&config);

    let backend = MySqlBackend::connect(&config).await?;
    migrate(backend, &delta, cli.dry_run).await
}

async fn migrate<B: SchemaBackend>(
    backend: B,
    delta: &SchemaDelta,
    dry_run: bool,
) -> Result<MigrationReport> {
    let report = MigrationRunner::new(backend, delta)
        .dry_run(dry_run)
        .on_step(console::print_step)
        .run()
        .await?;
    console::print_verification(&report);
    Ok(report)
}
