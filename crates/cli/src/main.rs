//! draftwright CLI, the main entry point.
//!
//! Commands:
//! - `init`       Write a default config file
//! - `index`      Build or rebuild the passage index from the corpus
//! - `search`     Inspect section retrieval
//! - `plan`       Plan and repair a proposal outline
//! - `generate`   Synthesize a full proposal
//! - `validate`   Validate (and optionally repair) a proposal document
//! - `doctor`     Diagnose config, corpus, index, and backend

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "draftwright",
    about = "draftwright: retrieval-augmented technical proposal synthesis",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Config file (defaults to ~/.draftwright/config.toml)
    #[arg(short, long, global = true, env = "DRAFTWRIGHT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Build the passage index from the prior-proposal corpus
    Index {
        /// Rebuild even if an index already exists
        #[arg(long)]
        force: bool,

        /// Corpus directory (overrides corpus.dir)
        #[arg(short, long)]
        directory: Option<PathBuf>,
    },

    /// Show the precedent passages retrieved for a section
    Search {
        /// Section name, e.g. METODOLOGIA
        section: String,

        /// Requirement context added to the query
        #[arg(short, long)]
        query: Option<String>,

        /// Number of passages
        #[arg(short, default_value_t = 3)]
        k: usize,
    },

    /// Plan a proposal outline from a requirement document
    Plan {
        /// Requirement file (JSON record or plain text)
        #[arg(short, long)]
        requirement: PathBuf,
    },

    /// Generate a full proposal
    Generate {
        /// Requirement file (JSON record or plain text)
        #[arg(short, long)]
        requirement: PathBuf,

        /// Outline JSON file; planned by the backend when omitted
        #[arg(long)]
        outline: Option<PathBuf>,

        /// Output file (default: propuesta_<timestamp>.md)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Extract a structured record from a free-text requirement first
        #[arg(long)]
        analyze: bool,
    },

    /// Validate a proposal document
    Validate {
        /// Proposal markdown file
        file: PathBuf,

        /// Apply deterministic repair
        #[arg(long)]
        repair: bool,

        /// Where to write the repaired document
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Diagnose config, corpus, index, and backend
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Init { force } => commands::init::run(config_path, force).await?,
        Commands::Index { force, directory } => {
            commands::index::run(config_path, force, directory).await?
        }
        Commands::Search { section, query, k } => {
            commands::search::run(config_path, &section, query, k).await?
        }
        Commands::Plan { requirement } => commands::plan::run(config_path, &requirement).await?,
        Commands::Generate {
            requirement,
            outline,
            output,
            analyze,
        } => commands::generate::run(config_path, &requirement, outline, output, analyze).await?,
        Commands::Validate {
            file,
            repair,
            output,
        } => commands::validate::run(&file, repair, output).await?,
        Commands::Doctor => commands::doctor::run(config_path).await?,
    }

    Ok(())
}
