//! CLI de operador sobre sesiones de anotación persistidas.
//!
//! `seqflow show|next|pop|delete <SESSION>` y `seqflow kits <CATALOG.json>`.
//! El backend sale de `SEQFLOW_STORE_BACKEND` / `SEQFLOW_UPLOADS_DIR`
//! (ver `SessionStoreConfig`); el nivel de log de `RUST_LOG`.
mod commands;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::CliError;
use seqflow_annotation::AnnotationFact;
use seqflow_persistence::{open_store, SessionStoreConfig};

#[derive(Parser)]
#[command(name = "seqflow")]
#[command(about = "Inspect and repair persisted library-annotation sessions", long_about = None)]
struct Cli {
    /// Uploads directory (overrides SEQFLOW_UPLOADS_DIR)
    #[arg(long, global = true)]
    uploads_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the session header and the facts of every step
    Show { session: String },
    /// Print the step the session would move to next
    Next { session: String },
    /// Drop the most recent step
    Pop { session: String },
    /// Delete the session without archiving it
    Delete { session: String },
    /// List the kits of a JSON kit catalog
    Kits { catalog: PathBuf },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

fn run(cli: Cli, out: &mut impl Write) -> Result<(), CliError> {
    if let Command::Kits { catalog } = &cli.command {
        return commands::kits(catalog, out);
    }
    let mut config = SessionStoreConfig::from_env()?;
    if let Some(dir) = cli.uploads_dir {
        config.uploads_dir = dir;
    }
    let store = open_store::<AnnotationFact>(&config)?;
    match cli.command {
        Command::Show { session } => commands::show(store, commands::parse_session(&session)?, out),
        Command::Next { session } => commands::next(store, commands::parse_session(&session)?, out),
        Command::Pop { session } => commands::pop(store, commands::parse_session(&session)?, out),
        Command::Delete { session } => commands::delete(store, commands::parse_session(&session)?, out),
        Command::Kits { .. } => Ok(()),
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    let mut stdout = io::stdout().lock();
    match run(cli, &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("cli:failed error={e}");
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
