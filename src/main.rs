//! # Odessa CLI (`odessa`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `odessa serve` | Start the HTTP API |
//! | `odessa summarize <file>` | Render a summary for a local file and print it |
//! | `odessa sections <file>` | Print the detected section buckets as JSON |
//!
//! ## Examples
//!
//! ```bash
//! odessa serve --config ./config/odessa.toml
//! odessa summarize paper.pdf --output paper.summary.md
//! odessa sections paper.pdf
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use odessa::config;
use odessa::extract::{PdfExtractor, TextExtractor};
use odessa::jobs::{render_summary, run_blocking, JobError};
use odessa::sections::split_sections;
use odessa::server;
use odessa::storage::sanitize_filename;

/// Odessa: turn uploaded PDFs into templated Markdown summaries.
#[derive(Parser)]
#[command(
    name = "odessa",
    about = "Odessa: turn uploaded PDFs into templated Markdown summaries",
    version,
    long_about = "Odessa extracts the text of a PDF, sorts its lines into abstract, introduction, \
    methods, results, and conclusion sections using keyword headers, and renders a fixed-template \
    Markdown summary. Run it as an HTTP service or one-off from the command line."
)]
struct Cli {
    /// Path to configuration file (TOML). Only `serve` reads it.
    #[arg(long, global = true, default_value = "./config/odessa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API.
    ///
    /// Binds to `[server].bind`, creates the upload and summary directories,
    /// and processes uploads in the background.
    Serve,

    /// Render a summary for a local file.
    ///
    /// Runs extraction, section splitting, and the summary template in the
    /// foreground. Prints the Markdown to stdout unless `--output` is given.
    Summarize {
        /// PDF (or `.txt`/`.md`) file to summarize.
        file: PathBuf,

        /// Write the summary here instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Filename shown in the summary heading. Defaults to the file's name.
        #[arg(long)]
        name: Option<String>,
    },

    /// Print the section buckets detected in a local file as JSON.
    Sections {
        /// PDF (or `.txt`/`.md`) file to inspect.
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Summarize { file, output, name } => {
            let heading = name.unwrap_or_else(|| display_name(&file));
            let input = file.clone();
            let summary = run_blocking(move || {
                render_summary(&PdfExtractor, &input, &heading).map_err(JobError::from)
            })
            .await
            .with_context(|| format!("Failed to summarize {}", file.display()))?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &summary)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("wrote {}", path.display());
                }
                None => println!("{}", summary),
            }
        }
        Commands::Sections { file } => {
            let input = file.clone();
            let text = run_blocking(move || PdfExtractor.extract(&input).map_err(JobError::from))
                .await
                .with_context(|| format!("Failed to extract {}", file.display()))?;
            let sections = split_sections(&text);
            println!("{}", serde_json::to_string_pretty(&sections)?);
        }
        Commands::Serve => {
            let cfg = config::load_config(&cli.config)?;
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}

fn display_name(file: &Path) -> String {
    sanitize_filename(&file.to_string_lossy())
}
