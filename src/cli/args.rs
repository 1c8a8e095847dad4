//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

/// Parent-aware entity hierarchies: declare model types, instantiate them, inspect their parentage
#[derive(Parser, Debug)]
#[command(name = "parentage")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Config file layered over the global config
    #[arg(short, long, global = true, env = "PARENTAGE_CONFIG", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List declared model types
    Types {
        /// Declaration file
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Only types deriving (transitively) from this one
        #[arg(long)]
        subclasses_of: Option<String>,
    },

    /// Instantiate a model and show its node tree
    Tree {
        /// Declaration file
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Model type to instantiate
        model: String,
        /// Name of the instance
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Show the parent chain of a field, e.g. `sub.leaf`
    Chain {
        /// Declaration file
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Model type to instantiate
        model: String,
        /// Dotted field path
        path: String,
    },

    /// Show the parent chain of every leaf
    Leaves {
        /// Declaration file
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Model type to instantiate
        model: String,
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

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective settings
    Show,
    /// Show global config path
    Path,
}
