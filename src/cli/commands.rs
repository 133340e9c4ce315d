//! Command definitions and structures for the CLI
//!
//! All clap-based argument definitions live here; handlers receive the parsed
//! values and never look at raw arguments.

use clap::{Parser, Subcommand};
use notification_forwarder::model::{PRIORITY_MAX, PRIORITY_MIN};
use std::path::PathBuf;

use super::args::parse_header;

/// Main CLI structure
#[derive(Parser)]
#[command(name = "notification-forwarder")]
#[command(about = "Forward device notifications to HTTP webhooks based on trigger rules")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding config.toml (default: ~/.notification-forwarder)
    #[arg(long, global = true, env = "NOTIFICATION_FORWARDER_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Write the default configuration file
    Init {
        /// Overwrite an existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Inspect or change configuration values
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Manage webhook destinations
    Destination {
        #[command(subcommand)]
        action: DestinationAction,
    },

    /// Manage trigger rules of a destination
    Rule {
        #[command(subcommand)]
        action: RuleAction,
    },

    /// Inspect the delivery log
    Log {
        #[command(subcommand)]
        action: LogAction,
    },

    /// Forward notification events read from stdin, one JSON object per line
    Ingest,

    /// Show which events read from stdin a destination would receive
    Preview {
        /// Destination id
        destination_id: i64,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set configuration value
    Set {
        /// Configuration key (e.g., dispatcher.max_attempts)
        key: String,
        /// Value to set; empty clears optional values
        value: String,
    },

    /// Get configuration value
    Get {
        /// Configuration key
        key: String,
    },
}

#[derive(Subcommand)]
pub enum DestinationAction {
    /// Add a webhook destination
    Add {
        /// Target URL (http or https)
        url: String,

        /// Extra request header, repeatable
        #[arg(long = "header", value_name = "NAME=VALUE", value_parser = parse_header)]
        headers: Vec<(String, String)>,

        /// Create the destination disabled
        #[arg(long)]
        disabled: bool,
    },

    /// List destinations, newest first
    List,

    /// Remove a destination and its rules
    Remove { id: i64 },

    /// Enable or disable a destination
    Toggle { id: i64 },
}

#[derive(Subcommand)]
pub enum RuleAction {
    /// Add a trigger rule to a destination
    Add {
        /// Destination id
        destination_id: i64,

        /// Case-insensitive substring of the package name
        #[arg(long)]
        package: Option<String>,

        /// Text searched in title, text, sub text and big text
        #[arg(long)]
        content: Option<String>,

        /// Treat --content as a regular expression
        #[arg(long, requires = "content")]
        regex: bool,

        #[arg(
            long,
            default_value_t = PRIORITY_MIN,
            allow_negative_numbers = true,
            value_parser = clap::value_parser!(i32).range(PRIORITY_MIN as i64..=PRIORITY_MAX as i64)
        )]
        min_priority: i32,

        #[arg(
            long,
            default_value_t = PRIORITY_MAX,
            allow_negative_numbers = true,
            value_parser = clap::value_parser!(i32).range(PRIORITY_MIN as i64..=PRIORITY_MAX as i64)
        )]
        max_priority: i32,

        /// Create the rule disabled
        #[arg(long)]
        disabled: bool,
    },

    /// List the rules of a destination
    List { destination_id: i64 },

    /// Remove a rule
    Remove { id: i64 },

    /// Enable or disable a rule
    Toggle { id: i64 },
}

#[derive(Subcommand)]
pub enum LogAction {
    /// List delivery records, newest first
    List {
        /// Only successful deliveries
        #[arg(long, conflicts_with = "failed")]
        success: bool,

        /// Only failed deliveries
        #[arg(long)]
        failed: bool,

        /// Only records for this package name
        #[arg(long)]
        package: Option<String>,

        /// Maximum number of records shown
        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },

    /// Number of stored records
    Count,

    /// Delete every record
    Clear,

    /// Delete records sent before the given time
    PruneBefore {
        /// Epoch milliseconds
        timestamp: i64,
    },
}
