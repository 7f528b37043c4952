//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand, ValueHint};

/// Ranked discussion threads: decayed subtree scoring and arrangement
#[derive(Parser, Debug)]
#[command(name = "threadrank")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity: -d info, -dd debug, -ddd trace
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Explicit config file, layered over the global one
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Snapshot file (overrides config)
    #[arg(long, global = true, env = "THREADRANK_SNAPSHOT", value_hint = ValueHint::FilePath)]
    pub snapshot: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the arranged thread below an entry
    Show {
        /// Root entry id
        root: i64,

        /// Only direct replies of the root
        #[arg(long)]
        depth_one: bool,

        /// Show this user's own votes
        #[arg(long)]
        viewer: Option<i64>,
    },

    /// Create a new entry
    #[command(group(ArgGroup::new("body_kind").required(true).args(["body", "url"])))]
    Post {
        /// Parent entry; omitted for a top-level forum
        #[arg(short, long)]
        parent: Option<i64>,

        #[arg(short, long)]
        title: Option<String>,

        /// Text body
        #[arg(short, long)]
        body: Option<String>,

        /// Link target
        #[arg(short, long)]
        url: Option<String>,

        /// Author account id
        #[arg(short, long)]
        author: i64,
    },

    /// Vote on an entry, replacing an earlier vote by the same user
    #[command(group(ArgGroup::new("direction").required(true).args(["up", "down", "clear"])))]
    Vote {
        entry: i64,

        #[arg(short = 'U', long)]
        user: i64,

        #[arg(long)]
        up: bool,

        #[arg(long)]
        down: bool,

        /// Withdraw the vote
        #[arg(long)]
        clear: bool,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Show config paths
    Path,
}
