//! Folio CLI - Re-lay out EPUB files for e-reading platforms

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use folio_core::Platform;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean an EPUB into the canonical layout
    Clean {
        /// Input EPUB
        input: PathBuf,

        /// Output EPUB
        output: PathBuf,

        /// Target platform (generic, duokan, zhangyue, kindle)
        #[arg(short, long)]
        platform: Option<Platform>,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,

        /// Rewrite documents in parallel
        #[arg(long)]
        parallel: bool,

        /// Keep the working tree in memory
        #[arg(long)]
        in_memory: bool,
    },

    /// Display the package metadata of an EPUB
    Info {
        /// Input EPUB
        input: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check an EPUB against the canonical layout
    Validate {
        /// Input EPUB
        input: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "folio_cli=debug,folio_core=debug"
    } else {
        "folio_cli=info,folio_core=warn"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Clean {
            input,
            output,
            platform,
            config,
            json,
            parallel,
            in_memory,
        } => {
            let options = commands::CleanOptions {
                platform,
                config,
                json,
                parallel,
                in_memory,
            };
            commands::clean(&input, &output, &options).await
        }

        Commands::Info { input, json } => commands::info(&input, json).await,

        Commands::Validate { input, json } => commands::validate(&input, json).await,
    }
}
