use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "same", about = "Local, single-user knowledge-base engine over a directory of Markdown notes")]
pub struct Cli {
    /// Path to a `same.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the configured vault path.
    #[arg(long, global = true)]
    pub vault_path: Option<PathBuf>,

    /// Override the configured embedding backend URL.
    #[arg(long, global = true)]
    pub embedding_url: Option<String>,

    /// Override the configured embedding model name.
    #[arg(long, global = true)]
    pub embedding_model: Option<String>,

    /// Emit debug-level logs.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Walk the vault, chunk and embed changed notes, and extract graph references.
    Index {
        /// Reindex every note regardless of its stored content hash.
        #[arg(long)]
        force: bool,
        /// Skip embedding, indexing text-only (FTS5 and LIKE search still work).
        #[arg(long)]
        lite: bool,
    },

    /// Run a ranked query against the vault.
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        top_k: usize,
        #[arg(long)]
        domain: Option<String>,
        #[arg(long)]
        workstream: Option<String>,
        #[arg(long)]
        agent: Option<String>,
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },

    /// Find notes similar to an already-indexed note.
    Similar {
        note_path: String,
        #[arg(long, default_value_t = 10)]
        top_k: usize,
    },

    /// Print the statistics from the most recent reindex.
    Stats,

    /// Inspect the reference graph extracted from the vault.
    Graph {
        #[command(subcommand)]
        command: GraphCommands,
    },
}

#[derive(Subcommand)]
pub enum GraphCommands {
    /// Overall node/edge counts.
    Stats,
    /// Notes and references reachable from a note within `depth` hops.
    Subgraph {
        note_path: String,
        #[arg(long, default_value_t = 2)]
        depth: usize,
    },
}
