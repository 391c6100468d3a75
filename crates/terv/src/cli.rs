use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "terv", version, about = "Version manager for OpenTofu and Terragrunt")]
pub struct Cli {
    /// Increase log verbosity (repeatable).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Override the terv root directory (defaults to TERV_ROOT or ~/.terv).
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Ignore installed versions when evaluating constraints.
    #[arg(long, global = true)]
    pub force_remote: bool,

    /// Allow automatic installs regardless of TERV_AUTO_INSTALL.
    #[arg(long, global = true)]
    pub install: bool,

    #[command(subcommand)]
    pub tool: ToolCommand,
}

#[derive(Debug, Subcommand)]
pub enum ToolCommand {
    /// Manage OpenTofu versions.
    Tofu {
        #[command(subcommand)]
        command: Command,
    },
    /// Manage Terragrunt versions.
    Terragrunt {
        #[command(subcommand)]
        command: Command,
    },
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve the version requested by the current context and print it.
    Detect,
    /// Install a version, a constraint's best match, or the resolved default.
    Install { version: Option<String> },
    /// Remove versions: a concrete version, a constraint, or `all`.
    Uninstall {
        #[arg(required = true)]
        targets: Vec<String>,
    },
    /// Evaluate a version and pin the result.
    Use {
        version: String,
        /// Pin in the working directory instead of the terv root.
        #[arg(long)]
        working_dir: bool,
    },
    /// List installed versions with their last-use dates.
    List,
    /// List remotely available versions.
    ListRemote,
    /// Show, set or reset the default version constraint.
    Constraint {
        expression: Option<String>,
        #[arg(long, conflicts_with = "expression")]
        reset: bool,
    },
    /// Remove the default version file.
    ResetVersion,
}
