//! Imprint CLI - content fingerprinting and ledger registration tool.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "imprint")]
#[command(author, version, about = "Content registration and similarity checking", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the content hash and perceptual signature of an image
    Fingerprint {
        /// Path to the image file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Compare two images and report their similarity score
    Compare {
        /// First image
        #[arg(value_name = "A")]
        a: PathBuf,

        /// Second image
        #[arg(value_name = "B")]
        b: PathBuf,

        /// Infringement threshold override (0.0 - 1.0)
        #[arg(short, long)]
        threshold: Option<f64>,
    },

    /// Register an image on the ownership ledger
    Register {
        /// Path to the image file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Owner account the content is registered to
        #[arg(short, long)]
        owner: String,

        /// Ledger gateway URL (defaults to IMPRINT_LEDGER_URL)
        #[arg(long)]
        ledger_url: Option<String>,
    },

    /// Check an image against registered content without writing anything
    Check {
        /// Path to the image file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Ledger gateway URL (defaults to IMPRINT_LEDGER_URL)
        #[arg(long)]
        ledger_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fingerprint { file } => commands::fingerprint::execute(file),
        Commands::Compare { a, b, threshold } => commands::compare::execute(a, b, threshold),
        Commands::Register {
            file,
            owner,
            ledger_url,
        } => commands::register::execute(file, owner, ledger_url).await,
        Commands::Check { file, ledger_url } => commands::check::execute(file, ledger_url).await,
    }
}
