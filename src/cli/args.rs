//! CLI argument structures.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Drive story lifecycles to done through an AI coding agent
#[derive(Parser)]
#[command(name = "storyflow")]
#[command(about = "storyflow - drive story lifecycles through an AI coding agent", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Working directory holding stories and sprint artifacts
    /// (defaults to the current directory)
    #[arg(short = 'p', long, global = true)]
    pub path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by the batch-running subcommands.
#[derive(Args, Debug, Clone)]
pub struct RunFlags {
    /// Print the planned step sequence without executing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Retry failed stories, waiting out detected rate limits
    #[arg(long)]
    pub auto_retry: bool,

    /// Maximum retries per story when --auto-retry is set
    #[arg(long, default_value = "3")]
    pub max_retries: u32,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one or more stories through their remaining lifecycle steps
    Story {
        /// Story keys, e.g. 6-1-setup
        #[arg(required = true)]
        keys: Vec<String>,

        #[command(flatten)]
        flags: RunFlags,
    },

    /// Run every story of one or more epics, or of all epics
    Epic {
        /// Epic ids, or `all` for every active epic
        #[arg(required = true)]
        ids: Vec<String>,

        #[command(flatten)]
        flags: RunFlags,
    },

    /// Run a single workflow step for a story
    Workflow {
        /// Workflow name, e.g. dev-story
        name: String,
        /// Story key
        key: String,
    },

    /// Send a raw prompt to the agent
    Raw {
        /// Prompt text, passed through unchanged
        prompt: String,
    },

    /// Sprint index operations
    Sprint {
        #[command(subcommand)]
        command: SprintCommands,
    },

    /// Print version information
    Version,
}

#[derive(Subcommand)]
pub enum SprintCommands {
    /// Rebuild the sprint index from story files
    Rebuild,
    /// Show per-story statuses scanned from story files
    Status,
}
