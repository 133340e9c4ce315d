//! CLI module providing command-line interface functionality
//!
//! This module handles argument parsing, command validation, and routing
//! to appropriate handlers while maintaining separation of concerns.

pub mod args;
pub mod commands;
pub mod context;
pub mod handlers;

use anyhow::Result;
use clap::Parser;

pub use args::ArgProcessor;
pub use commands::{Cli, Commands, ConfigAction, DestinationAction, LogAction, RuleAction};
pub use context::CliContext;
pub use handlers::CommandHandler;

pub struct CliApp;

impl CliApp {
    /// Parse command line arguments and execute the requested command
    pub async fn run() -> Result<()> {
        let cli = Cli::parse();

        ArgProcessor::new().validate_command(&cli.command)?;

        let context = CliContext::new(cli.config_dir.clone(), cli.verbose)?;

        // Keep the guard alive so the file writer flushes on exit
        let _log_guard = context.init_logging()?;

        let handler = CommandHandler::new(context);
        handler.handle_command(cli.command).await
    }
}
