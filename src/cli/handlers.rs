//! Command handlers for all CLI operations
//!
//! [`CommandHandler`] routes each parsed command to the handler for its area.
//! Handlers that touch destinations, rules or the delivery log share one
//! [`ForwarderApp`] built from the context.

mod config;
mod destination;
mod forward;
mod log;
mod rule;

use super::{CliContext, Commands};
use anyhow::Result;
use tokio::io::BufReader;

use config::ConfigHandler;
use destination::DestinationHandler;
use forward::ForwardHandler;
use log::LogHandler;
use rule::RuleHandler;

/// Coordinates all command handling operations with dependency injection via CliContext
pub struct CommandHandler {
    context: CliContext,
}

impl CommandHandler {
    pub fn new(context: CliContext) -> Self {
        Self { context }
    }

    /// Route commands to their appropriate handlers
    pub async fn handle_command(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Init { force } => ConfigHandler::new(&self.context).handle_init(force),
            Commands::Config { action } => ConfigHandler::new(&self.context).handle_config(action),
            Commands::Destination { action } => {
                let app = self.context.app()?;
                DestinationHandler::new(&app).handle(action).await
            }
            Commands::Rule { action } => {
                let app = self.context.app()?;
                RuleHandler::new(&app).handle(action).await
            }
            Commands::Log { action } => {
                let app = self.context.app()?;
                LogHandler::new(&app).handle(action).await
            }
            Commands::Ingest => {
                let app = self.context.app()?;
                ForwardHandler::new(&app).handle_ingest(stdin_reader()).await
            }
            Commands::Preview { destination_id } => {
                let app = self.context.app()?;
                ForwardHandler::new(&app)
                    .handle_preview(destination_id, stdin_reader())
                    .await
            }
        }
    }
}

fn stdin_reader() -> BufReader<tokio::io::Stdin> {
    BufReader::new(tokio::io::stdin())
}

/// Render epoch milliseconds as local-independent UTC text.
fn format_millis(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn enabled_label(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}
