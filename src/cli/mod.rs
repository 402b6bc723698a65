//! CLI module for Advisor.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Advisor - a retrieval-augmented faculty advisor assistant
///
/// Answers questions about graduate faculty from a corpus of advisor records.
#[derive(Parser, Debug)]
#[command(name = "advisor")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check API tokens, corpus and configuration
    Doctor,

    /// Build the index and report its size
    Index,

    /// Ask a question answered from the advisor records
    Ask {
        /// The question to ask
        question: String,

        /// Number of advisor records to use as context
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Generation model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Show the advisor records closest to a query
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short = 'k', long, default_value = "5")]
        top_k: usize,
    },

    /// Start an interactive chat session
    Chat {
        /// Answer from the advisor records instead of the persona alone
        #[arg(long)]
        rag: bool,
    },

    /// Detect keywords and intent in a query
    Analyze {
        /// Query to analyse
        query: String,
    },

    /// Start HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the current configuration to the config file
    Init {
        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },
}
