//! # docqa CLI
//!
//! The `docqa` binary is the interface to the document QA pipeline. It
//! provides commands for managing the ingestion root, building the vector
//! index, and asking questions against it.
//!
//! ## Usage
//!
//! ```bash
//! docqa --config ./docqa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa ingest [--fresh]` | Load, chunk, embed and store every file in the data directory |
//! | `docqa ask "<question>"` | Answer one question |
//! | `docqa chat` | Multi-turn session (`exit`, `clear`, `history`) |
//! | `docqa status` | Store state and uploaded files |
//! | `docqa add <files…>` | Copy files into the data directory |
//! | `docqa remove <file>` | Delete a file from the data directory |
//! | `docqa table <file> <table>` | Describe one table of a SQLite file |
//! | `docqa delete-store` | Delete the vector store (alias: `reset`) |
//!
//! ## Examples
//!
//! ```bash
//! # Upload and index
//! docqa add ~/notes/biology.pdf
//! docqa ingest
//!
//! # Ask with the API key from .env
//! echo 'GOOGLE_API_KEY=...' > .env
//! docqa ask "What is parthenogenesis?"
//!
//! # Rebuild from scratch
//! docqa ingest --fresh
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use docqa::{chat, config, ingest, llm, manage, stats};

/// docqa — ask questions about your documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docqa.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "docqa",
    about = "docqa — a local-first document question-answering pipeline",
    version,
    long_about = "docqa ingests text, PDF, Word, PowerPoint, JSON, XML, CSV and SQLite files, \
    indexes their chunks as embedding vectors, and answers questions with a generative model \
    grounded on the closest chunks, falling back to extracted sentences when the model fails."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./docqa.toml`. A missing file means built-in defaults.
    #[arg(long, global = true, default_value = "./docqa.toml")]
    config: PathBuf,

    /// Log pipeline progress to stderr (overridden by `RUST_LOG`).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Ingest every supported file in the data directory.
    ///
    /// Each file is converted to text records, split into overlapping
    /// chunks, embedded, and appended to the vector store. Files that fail
    /// to load are reported and skipped.
    Ingest {
        /// Clear the existing store before adding.
        #[arg(long)]
        fresh: bool,
    },

    /// Answer one question (no conversation history).
    Ask {
        /// The question text.
        question: String,
    },

    /// Start an interactive multi-turn session.
    ///
    /// Recent exchanges are included in each prompt. Type `exit` to quit,
    /// `clear` to reset the history, `history` to show it.
    Chat,

    /// Show store state, chunk counts, and uploaded files.
    Status,

    /// Copy files into the data directory.
    Add {
        /// Files to copy. Unsupported extensions are rejected.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Delete one file from the data directory.
    Remove {
        /// Bare file name inside the data directory.
        file: String,
    },

    /// Describe one table of a SQLite database.
    ///
    /// Prints the schema and up to `database.table_row_limit` sample rows.
    Table {
        /// Database file: a name in the data directory, or any path.
        file: PathBuf,
        /// Table name.
        table: String,
    },

    /// Delete the persisted vector store.
    #[command(alias = "reset")]
    DeleteStore,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cfg = config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Ingest { fresh } => {
            ingest::run_ingest(&cfg, fresh).await?;
        }
        Commands::Ask { question } => {
            let model = llm::create_model(&cfg.llm)?;
            chat::run_ask(&cfg, model.as_ref(), &question).await?;
        }
        Commands::Chat => {
            let model = llm::create_model(&cfg.llm)?;
            chat::run_chat(&cfg, model.as_ref()).await?;
        }
        Commands::Status => {
            stats::run_status(&cfg).await?;
        }
        Commands::Add { files } => {
            manage::run_add(&cfg, &files)?;
        }
        Commands::Remove { file } => {
            manage::run_remove(&cfg, &file)?;
        }
        Commands::Table { file, table } => {
            manage::run_table(&cfg, &file, &table).await?;
        }
        Commands::DeleteStore => {
            manage::run_delete_store(&cfg).await?;
        }
    }

    Ok(())
}
