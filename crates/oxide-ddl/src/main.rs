//! oxide-ddl CLI
//!
//! Command-line tool that creates whatever a declared schema is missing.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_ddl::prelude::*;

/// Additive schema reconciliation for PostgreSQL, MySQL and SQLite.
#[derive(Parser)]
#[command(name = "oxide-ddl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL (sqlite:, postgres:// or mysql://).
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:db.sqlite3")]
    database: String,

    /// JSON file with the table definitions.
    #[arg(short, long, env = "OXIDE_DDL_SCHEMA")]
    schema: Option<PathBuf>,

    /// What to do with unknown directive modifiers.
    #[arg(long, value_enum, default_value_t = UnknownModifiers::Warn)]
    unknown_modifiers: UnknownModifiers,

    /// Do not report type and nullability drift of existing columns.
    #[arg(long)]
    no_drift: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the statements that would bring the database up to date.
    Plan {
        /// Output format.
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Create missing tables, columns, constraints and indices.
    Apply {
        /// Show SQL without executing (dry run).
        #[arg(long)]
        dry_run: bool,
    },

    /// Dump the live schema as JSON.
    Inspect,
}

#[derive(Clone, Copy, ValueEnum)]
enum UnknownModifiers {
    Warn,
    Deny,
}

impl From<UnknownModifiers> for ModifierPolicy {
    fn from(value: UnknownModifiers) -> Self {
        match value {
            UnknownModifiers::Warn => Self::Warn,
            UnknownModifiers::Deny => Self::Deny,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

async fn declared_schema(cli: &Cli, dialect: DialectKind) -> anyhow::Result<WantTables> {
    let path: &Path = cli
        .schema
        .as_deref()
        .context("--schema is required for this command")?;
    let defs = load_schema_file(path).await?;
    let options = BuildOptions::new().unknown_modifiers(cli.unknown_modifiers.into());
    let want = WantTables::build(&defs, dialect, options)?;
    info!(
        tables = want.tables().len(),
        skipped = want.skipped().len(),
        "Loaded schema"
    );
    Ok(want)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let database = Database::connect(&cli.database).await?;
    let dialect = database.kind();
    let options = ReconcileOptions::new().detect_drift(!cli.no_drift);

    match &cli.command {
        Commands::Plan { format } => {
            let want = declared_schema(&cli, dialect).await?;
            let executor = Executor::new(database.clone()).reconcile_options(options);
            let plan = executor.plan(&want).await?;

            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
                Format::Text => {
                    for warning in &plan.warnings {
                        warn!(warning = %warning, "Schema warning");
                    }
                    if plan.is_empty() {
                        info!("Database is up to date.");
                    }
                    for action in &plan.actions {
                        println!("-- {action}");
                        for statement in action.statements(want.dialect())? {
                            println!("{statement};");
                        }
                    }
                }
            }
        }

        Commands::Apply { dry_run } => {
            let want = declared_schema(&cli, dialect).await?;
            if *dry_run {
                info!("Dry run mode - SQL will be printed but not executed.");
            }
            let executor = Executor::new(database.clone())
                .reconcile_options(options)
                .dry_run(*dry_run);
            let report = executor.apply(&want).await?;
            info!(
                actions = report.plan.actions.len(),
                statements = report.statements.len(),
                "Done"
            );
        }

        Commands::Inspect => {
            let catalog = database.snapshot().await?;
            let tables: Vec<_> = catalog.tables().collect();
            println!("{}", serde_json::to_string_pretty(&tables)?);
        }
    }

    database.close().await;
    Ok(())
}
