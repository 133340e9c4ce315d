//! Notification Forwarder Library
//!
//! Decides, per configured destination, whether an observed notification
//! should be forwarded, posts it to the destination's webhook with retry, and
//! keeps a bounded log of every delivery outcome.

pub mod active;
pub mod app;
pub mod config;
pub mod delivery;
pub mod errors;
pub mod logging;
pub mod matcher;
pub mod model;
pub mod service;
pub mod store;

// Re-export commonly used types for convenience
pub use active::ActiveNotifications;
pub use app::ForwarderApp;
pub use config::{Config, ConfigManager};
pub use delivery::{HttpTransport, RetryPolicy, WebhookDispatcher, WebhookTransport};
pub use errors::{AppError, AppResult};
pub use matcher::TriggerMatcher;
pub use model::{DeliveryRecord, Destination, NotificationEvent, TriggerRule};
pub use service::ForwarderService;
