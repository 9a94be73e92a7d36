use clap::{Parser, Subcommand};

fn get_version() -> &'static str {
    const BASE_VERSION: &str = env!("CARGO_PKG_VERSION");

    if let Some(tag) = option_env!("MCSITE_GIT_TAG") {
        return tag;
    }

    let commit = option_env!("MCSITE_GIT_COMMIT").unwrap_or("unknown");
    let branch = option_env!("MCSITE_GIT_BRANCH").unwrap_or("unknown");

    // Built once at startup; leaking gives clap the 'static str it wants.
    let version = format!("v{}-{} ({})", BASE_VERSION, commit, branch);
    Box::leak(version.into_boxed_str())
}

#[derive(Parser)]
#[command(name = "mcsite")]
#[command(about = "Release, changelog and download resolver for the MCEdit site")]
#[command(version = get_version(), propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (use multiple times for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Reduce output to errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Ignore cached responses and fetch everything again
    #[arg(long, global = true)]
    pub refresh: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load and render the whole page (navigation, downloads, changelog)
    Page {
        /// URL of the page being viewed, used to mark the active nav item
        #[arg(long)]
        page: Option<String>,
    },

    /// Render the navigation bar
    Nav {
        /// URL of the page being viewed
        #[arg(long)]
        page: Option<String>,
    },

    /// List every release, newest first
    Changelog,

    /// Show the latest stable and pre-release tags
    Latest,

    /// Resolve the download URL for one platform and bit width
    #[command(disable_version_flag = true)]
    #[command(after_help = "Examples:\n  mcsite download\n  mcsite download --platform win --bits 32\n  mcsite download --platform lin --version 1.5.0.0")]
    Download {
        /// win, osx or lin (defaults to this machine)
        #[arg(long)]
        platform: Option<String>,
        /// 32, 64 or universal (defaults to this machine)
        #[arg(long)]
        bits: Option<String>,
        /// Release tag (defaults to the latest stable release)
        #[arg(long)]
        version: Option<String>,
    },

    /// Show the download buttons for the latest release
    Downloads,

    /// List contributors with their activity
    Contributors,

    /// Show the GitHub API rate limit status
    RateLimit,

    /// Compare two version strings (prints -1, 0, 1 or NaN)
    Compare {
        a: String,
        b: String,
        /// Compare segments as strings instead of numbers
        #[arg(long)]
        lexicographical: bool,
        /// Pad the shorter version with zero segments
        #[arg(long)]
        zero_extend: bool,
    },

    /// Inspect or clear cached responses
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Manage mcsite's configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show the current version
    Version,
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// List cached locators
    List,
    /// Remove every cached response
    Clear,
    /// Remove the cached response for one locator
    Evict {
        /// Locator as fetched (URL or site-relative path)
        locator: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a configuration setting
    Get {
        /// Key to get (if omitted, shows all settings)
        key: Option<String>,
    },
    /// Set a configuration setting
    Set {
        /// Key and value (e.g., 'rate-limit-threshold=5' or 'rate-limit-threshold 5')
        #[arg(trailing_var_arg = true, required = true)]
        args: Vec<String>,
    },
    /// Reset a configuration setting to its default
    Unset {
        /// Key to unset (e.g., 'eviction')
        key: String,
    },
    /// Show full configuration
    Show {
        /// Output format (json, yaml)
        #[arg(long, default_value = "json")]
        format: String,
    },
}
