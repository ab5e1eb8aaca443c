//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum, ValueHint};

use crate::config::OutputFormat;

/// Build DOM trees from declarative JSON descriptors
#[derive(Parser, Debug)]
#[command(name = "domkit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbose logging to stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Project directory (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// How built nodes are attached to the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Append as last children of the target
    Append,
    /// Insert before the `--before` sibling
    #[value(alias = "insertBefore")]
    InsertBefore,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Append => "append",
            Mode::InsertBefore => "insert-before",
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a descriptor, optionally into a page
    Build {
        /// JSON descriptor file
        #[arg(value_hint = ValueHint::FilePath)]
        descriptor: PathBuf,
        /// HTML page to build into (default: empty document)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        page: Option<PathBuf>,
        /// Selector of the element to attach to (default: body)
        #[arg(short, long)]
        into: Option<String>,
        /// Attach mode
        #[arg(short, long, value_enum)]
        mode: Option<Mode>,
        /// Selector of the reference sibling for insert-before
        #[arg(short, long)]
        before: Option<String>,
        /// Output format (default from config)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Print elements of a page matching a selector
    Query {
        /// HTML page
        #[arg(value_hint = ValueHint::FilePath)]
        page: PathBuf,
        /// CSS selector
        selector: String,
        /// Print every match instead of the first
        #[arg(short, long)]
        all: bool,
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
    /// Show effective configuration
    Show,
    /// Create a config template
    Init {
        /// Write the global config instead of the project one
        #[arg(short, long)]
        global: bool,
    },
    /// Show config file locations
    Path,
}
