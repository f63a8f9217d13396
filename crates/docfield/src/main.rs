//! docfield CLI - Main entry point

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "docfield")]
#[command(version)]
#[command(about = "Citation field-code injection for unpacked docx documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inject citation and bibliography field codes into a document
    Inject {
        /// Working directory containing the unpacked document tree
        #[arg(long)]
        unpacked: PathBuf,

        /// Reference ledger JSON file
        #[arg(long)]
        refs: PathBuf,

        /// Fail instead of degrading when namespace repair cannot produce
        /// a conformant document
        #[arg(long)]
        strict: bool,

        /// Run the full pipeline and report, but write nothing
        #[arg(long)]
        dry_run: bool,
    },

    /// Locate citation markers and report their resolution without editing
    Scan {
        /// Working directory containing the unpacked document tree
        #[arg(long)]
        unpacked: PathBuf,

        /// Reference ledger JSON file
        #[arg(long)]
        refs: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docfield=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inject {
            unpacked,
            refs,
            strict,
            dry_run,
        } => commands::inject::execute(&unpacked, &refs, strict, dry_run),
        Commands::Scan { unpacked, refs } => commands::scan::execute(&unpacked, &refs),
    }
}
