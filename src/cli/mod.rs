//! CLI argument definitions for tplsync.

use clap::{ArgAction, Parser, Subcommand};

/// tplsync - copy template subtasks onto matching Todoist tasks.
///
/// A project named "Task Templates" nested under another project holds
/// template tasks. Every task in the parent project whose content matches a
/// template task receives that template's subtasks. Running `apply` again
/// creates nothing new.
#[derive(Parser, Debug)]
#[command(name = "tplsync")]
#[command(author, version, about = "Propagate template subtasks across Todoist projects", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Increase log verbosity (-v info, -vv debug). TPLSYNC_LOG overrides.
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Directory holding config.kdl and state.kdl
    #[arg(long = "config-dir", global = true, env = "TPLSYNC_CONFIG_DIR")]
    pub config_dir: Option<std::path::PathBuf>,

    /// Name of template projects (overrides config.kdl)
    #[arg(long = "template-name", global = true)]
    pub template_name: Option<String>,

    /// Sync API base URL (overrides config.kdl)
    #[arg(long = "api-url", global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Copy template subtasks onto matching tasks and commit the batch
    Apply {
        /// Compute and report the creations without sending anything
        #[arg(long)]
        dry_run: bool,

        /// API token (overrides TODOIST_API_TOKEN and state.kdl)
        #[arg(short = 'k', long)]
        token: Option<String>,
    },

    /// Print the project and task hierarchy
    Tree {
        /// API token (overrides TODOIST_API_TOKEN and state.kdl)
        #[arg(short = 'k', long)]
        token: Option<String>,
    },

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved settings and where each came from
    Show,

    /// Set a configuration value in config.kdl
    Set {
        /// Configuration key (api-url, template-name, output-format)
        key: String,
        /// Configuration value
        value: String,
    },

    /// Store the API token in state.kdl (reads stdin when omitted)
    SetToken {
        /// API token
        token: Option<String>,
    },
}
