//! CLI definitions for ShivAI.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// ShivAI CLI.
#[derive(Parser)]
#[command(name = "shivai")]
#[command(about = "Offline voice and text command agent")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (defaults to the user config directory)
    #[arg(short, long, env = "SHIVAI_CONFIG", global = true)]
    pub(crate) config: Option<PathBuf>,

    /// Log at debug level regardless of configuration
    #[arg(long, global = true)]
    pub(crate) debug: bool,

    #[command(subcommand)]
    pub(crate) command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Interactive text session (default)
    Run,

    /// Handle a single utterance and print the reply
    Exec {
        /// Utterance text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Show how an utterance is classified without executing it
    Parse {
        /// Utterance text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Also list every matching pattern
        #[arg(long)]
        candidates: bool,
    },

    /// List plugins and their lifecycle state
    Plugins {
        /// Output format (table, json)
        #[arg(long, default_value = "table")]
        format: String,
    },
}
