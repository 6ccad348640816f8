use clap::{Parser, Subcommand};
use std::path::PathBuf;

fn get_version() -> &'static str {
    const BASE_VERSION: &str = env!("CARGO_PKG_VERSION");

    // If there's a git tag at HEAD, use just the tag (release build)
    if let Some(tag) = option_env!("KRYER_INSTALLER_GIT_TAG") {
        return tag;
    }

    // Not on a tag - include commit hash and branch (dev build)
    let commit = option_env!("KRYER_INSTALLER_GIT_COMMIT").unwrap_or("unknown");
    let branch = option_env!("KRYER_INSTALLER_GIT_BRANCH").unwrap_or("unknown");

    // Leaked once at startup
    let version = format!("v{}-{} ({})", BASE_VERSION, commit, branch);
    Box::leak(version.into_boxed_str())
}

#[derive(Parser)]
#[command(name = "kryer-installer")]
#[command(about = "Installs the latest Kryer release from GitHub")]
#[command(version = get_version(), propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (use multiple times for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Reduce output to errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Directory to install into
    #[arg(long, global = true)]
    pub install_root: Option<PathBuf>,

    /// GitHub repository to install from (e.g., 'owner/repo')
    #[arg(long, global = true)]
    pub repo: Option<String>,

    /// GitHub API root URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Do not wait for a key press before exiting
    #[arg(long, global = true)]
    pub no_pause: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install or update to the latest release (default)
    Install {
        /// Reinstall without asking when already installed
        #[arg(short, long)]
        yes: bool,
        /// Install this release tag instead of the latest release
        #[arg(long)]
        tag: Option<String>,
    },

    /// Remove the installed executable and its PATH entry
    Uninstall,

    /// Remove temporary files left behind by an interrupted install
    Clean,

    /// Show the effective installer configuration
    Config {
        /// Output format (json, yaml)
        #[arg(long, default_value = "json")]
        format: String,
    },

    /// Show the current version
    Version,
}
