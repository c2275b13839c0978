use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "cartola")]
#[command(version, about = "Normalize Chilean bank statements and reconcile them against accounting exports")]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a bank statement (.csv, .xlsx, .xls, .ods)
    Normalize {
        /// Statement file
        statement: PathBuf,

        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// TOML settings file (only the [statement] table applies)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Report bank expenses with no backing accounting document
    Reconcile {
        /// Statement file
        statement: PathBuf,

        /// Accounting export (first row is the header)
        accounting: PathBuf,

        /// TOML settings file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Date tolerance in days (overrides the config file)
        #[arg(long)]
        days: Option<i64>,

        /// Amount tolerance as a fraction of the expense, e.g. 0.05 (overrides the config file)
        #[arg(long)]
        fraction: Option<f64>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries the JSON/CSV output; logs go to stderr.
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Normalize { statement, format, config } => {
            let settings = commands::resolve_config(config.as_deref(), None, None)?;
            commands::normalize(&statement, format, &settings, &mut out)?;
        }

        Commands::Reconcile { statement, accounting, config, days, fraction } => {
            let settings = commands::resolve_config(config.as_deref(), days, fraction)?;
            commands::reconcile(&statement, &accounting, &settings, &mut out)?;
        }
    }

    Ok(())
}
