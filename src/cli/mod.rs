//! CLI definitions and entry point.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// Report, upvote and resolve civic infrastructure issues
#[derive(Parser, Debug)]
#[command(name = "cw", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Backend to use: local or remote
    #[arg(long, global = true)]
    pub mode: Option<String>,

    /// Local database path (default: .civicwatch/issues.db)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Act as this user id (local backend)
    #[arg(long, global = true)]
    pub identity: Option<String>,

    /// Role for the local backend: citizen or authority
    #[arg(long, global = true)]
    pub role: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List issues
    #[command(alias = "ls")]
    List(ListArgs),

    /// Report a new issue
    Create(CreateArgs),

    /// Upvote an issue
    Upvote {
        /// Issue ID
        id: String,
    },

    /// Mark an issue solved (authority only)
    Solve {
        /// Issue ID
        id: String,
    },

    /// Mark an issue unsolved again (authority only)
    Unsolve {
        /// Issue ID
        id: String,
    },

    /// Delete an issue (local backend, authority only)
    Delete {
        /// Issue ID
        id: String,
    },

    /// Show the current identity
    Whoami,

    /// Export all issues as CSV (authority only)
    Export(ExportArgs),

    /// List every tag in use
    Tags,

    /// Count issues by status
    #[command(alias = "stats")]
    Summary,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Match description, address or tag (case-insensitive)
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Filter by status: all, solved, unsolved
    #[arg(long, default_value = "all")]
    pub status: String,

    /// Filter by exact tag (case-insensitive)
    #[arg(long, short = 't')]
    pub tag: Option<String>,

    /// Sort order: trending, newest, most_upvoted
    #[arg(long, default_value = "trending")]
    pub sort: String,

    /// Only issues I reported
    #[arg(long)]
    pub mine: bool,

    /// Maximum number of results (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    pub limit: usize,
}

#[derive(Args, Debug, Clone, Default)]
pub struct CreateArgs {
    /// What is wrong
    #[arg(long, short = 'd')]
    pub description: String,

    /// Where it is
    #[arg(long, short = 'a')]
    pub address: String,

    /// Tags, separated by spaces or commas (can be repeated)
    #[arg(long, short = 't')]
    pub tags: Vec<String>,

    /// Photo to attach
    #[arg(long)]
    pub image: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ExportArgs {
    /// Write to this file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}
