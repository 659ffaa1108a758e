//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "querycase",
    version,
    about = "Incremental case-law harvester with local semantic search",
    long_about = "querycase incrementally fetches court opinions from a paginated upstream API, \
                  extracts and quality-gates their text, and maintains a locally searchable \
                  vector index over chunks of that text. Fetching is checkpointed and resumable."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/querycase/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch new documents and fold them into the index
    Update {
        /// Stop after this many batches (default: run until pagination ends)
        #[arg(long)]
        max_batches: Option<usize>,

        /// Documents per batch (overrides the configured batch size)
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Semantic search over the indexed chunks
    Search {
        /// Search query text
        query: String,

        /// Maximum number of results to return
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Re-extract text from raw artifacts left on disk into JSON records
    Convert {
        /// Minimum extracted-text length to keep a record
        #[arg(long, default_value_t = crate::quality::CONVERT_MIN_CHARS)]
        min_chars: usize,
    },

    /// Show checkpoint position, index size, and pending records
    Status,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// File to validate (defaults to the standard location)
        file: Option<PathBuf>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
