//! `medallion` — bronze→silver→gold booking pipeline CLI.

mod commands;
mod exit_codes;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use exit_codes::{EXIT_CONFIG, EXIT_DATA_QUALITY, EXIT_STORE, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(
    name = "medallion",
    version,
    about = "Reconcile raw booking sources into a canonical ledger and daily KPIs"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: reconcile bronze into silver, then roll up gold
    #[command(after_help = "\
Examples:
  medallion run lakehouse.toml
  medallion run lakehouse.toml --json
  medallion run lakehouse.toml --db /tmp/scratch.db")]
    Run {
        /// Path to the pipeline TOML config
        config: PathBuf,

        /// Override the database path from the config
        #[arg(long)]
        db: Option<PathBuf>,

        /// Output the structured run report as JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Reconcile bronze sources into the silver ledger
    Reconcile {
        config: PathBuf,
        #[arg(long)]
        db: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },

    /// Roll up the silver ledger into gold daily KPIs
    Aggregate {
        config: PathBuf,
        #[arg(long)]
        db: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },

    /// Validate a pipeline config without running
    #[command(after_help = "\
Examples:
  medallion validate lakehouse.toml")]
    Validate {
        config: PathBuf,
    },

    /// Seed a source's bronze table from CSV (dev/test stand-in for ingestion)
    #[command(after_help = "\
Examples:
  medallion load lakehouse.toml --source bookings --file bookings.csv")]
    Load {
        config: PathBuf,
        /// Source system name as configured under [sources]
        #[arg(long)]
        source: String,
        /// CSV file with the bronze contract columns
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Read-only diagnostics over a pipeline layer
    #[command(after_help = "\
Examples:
  medallion inspect lakehouse.toml bronze
  medallion inspect lakehouse.toml silver
  medallion inspect lakehouse.toml gold")]
    Inspect {
        config: PathBuf,
        #[arg(value_enum)]
        layer: Layer,
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Layer {
    Bronze,
    Silver,
    Gold,
}

pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<medallion_pipeline::PipelineError> for CliError {
    fn from(e: medallion_pipeline::PipelineError) -> Self {
        use medallion_pipeline::PipelineError::*;
        let code = match e {
            ConfigParse(_) | ConfigValidation(_) | UnknownSource(_) => EXIT_CONFIG,
            UnmappedStatus { .. }
            | AmbiguousConflict { .. }
            | MissingColumn { .. }
            | DateParse { .. }
            | TimestampParse { .. }
            | PriceParse { .. }
            | Io(_) => EXIT_DATA_QUALITY,
        };
        Self { code, message: e.to_string(), hint: None }
    }
}

impl From<medallion_store::StoreError> for CliError {
    fn from(e: medallion_store::StoreError) -> Self {
        Self { code: EXIT_STORE, message: e.to_string(), hint: None }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { config, db, json } => commands::cmd_run(&config, db.as_deref(), json),
        Commands::Reconcile { config, db, json } => {
            commands::cmd_reconcile(&config, db.as_deref(), json)
        }
        Commands::Aggregate { config, db, json } => {
            commands::cmd_aggregate(&config, db.as_deref(), json)
        }
        Commands::Validate { config } => commands::cmd_validate(&config),
        Commands::Load { config, source, file, db } => {
            commands::cmd_load(&config, &source, &file, db.as_deref())
        }
        Commands::Inspect { config, layer, db } => {
            commands::cmd_inspect(&config, layer, db.as_deref())
        }
    };

    if let Err(e) = result {
        eprintln!("medallion: {}", e.message);
        if let Some(hint) = e.hint {
            eprintln!("hint: {hint}");
        }
        return ExitCode::from(e.code);
    }
    ExitCode::from(EXIT_SUCCESS)
}
