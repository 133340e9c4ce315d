//! Composition root.
//!
//! [`ForwarderApp`] wires stores, transport, dispatcher and the active
//! notification snapshot together once, from a [`Config`], and exposes the
//! configuration operations as plain async calls.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::active::ActiveNotifications;
use crate::config::Config;
use crate::delivery::{DispatchSettings, HttpTransport, WebhookDispatcher, WebhookTransport};
use crate::errors::{AppError, AppResult};
use crate::matcher::TriggerMatcher;
use crate::model::{Destination, NotificationEvent, TriggerRule};
use crate::service::ForwarderService;
use crate::store::{
    DeliveryLog, DeliveryLogStore, DestinationStore, MemoryDeliveryLogStore, MemoryDestinationStore, SnapshotFile,
};

pub const DESTINATIONS_FILE: &str = "destinations.json";
pub const DELIVERY_LOG_FILE: &str = "delivery_log.json";

pub struct ForwarderApp {
    destinations: Arc<dyn DestinationStore>,
    log: DeliveryLog,
    dispatcher: WebhookDispatcher,
    active: Arc<ActiveNotifications>,
    matcher: TriggerMatcher,
}

impl ForwarderApp {
    /// Build the application from configuration.
    ///
    /// With `storage.persist` set, state is loaded from and saved to snapshot
    /// files in `data_dir`; otherwise everything lives in memory.
    pub fn build(config: &Config, data_dir: &Path) -> AppResult<Self> {
        let (destinations, log_store): (Arc<dyn DestinationStore>, Arc<dyn DeliveryLogStore>) =
            if config.storage.persist {
                (
                    Arc::new(MemoryDestinationStore::open(SnapshotFile::new(data_dir.join(DESTINATIONS_FILE)))?),
                    Arc::new(MemoryDeliveryLogStore::open(SnapshotFile::new(data_dir.join(DELIVERY_LOG_FILE)))?),
                )
            } else {
                (
                    Arc::new(MemoryDestinationStore::new()),
                    Arc::new(MemoryDeliveryLogStore::new()),
                )
            };

        let transport = Arc::new(
            HttpTransport::new(config.dispatcher.request_timeout(), config.dispatcher.user_agent.as_deref())?
                .with_body_limit(config.dispatcher.response_body_limit()),
        );

        Ok(Self::from_parts(
            destinations,
            log_store,
            transport,
            config.dispatch_settings(),
            config.retention.max_records,
        ))
    }

    /// Assemble from explicit parts; used by tests and embedders with their own stores.
    pub fn from_parts(
        destinations: Arc<dyn DestinationStore>,
        log_store: Arc<dyn DeliveryLogStore>,
        transport: Arc<dyn WebhookTransport>,
        settings: DispatchSettings,
        retention_cap: usize,
    ) -> Self {
        let log = DeliveryLog::new(log_store, retention_cap);
        let dispatcher = WebhookDispatcher::new(Arc::clone(&destinations), log.clone(), transport, settings);
        Self {
            destinations,
            log,
            dispatcher,
            active: Arc::new(ActiveNotifications::new()),
            matcher: TriggerMatcher::new(),
        }
    }

    pub fn destinations(&self) -> &Arc<dyn DestinationStore> {
        &self.destinations
    }

    pub fn delivery_log(&self) -> &DeliveryLog {
        &self.log
    }

    pub fn dispatcher(&self) -> &WebhookDispatcher {
        &self.dispatcher
    }

    pub fn active(&self) -> &Arc<ActiveNotifications> {
        &self.active
    }

    /// Spawn the background forwarding queue. Must be called inside a tokio runtime.
    ///
    /// Each service gets a child of the dispatcher's cancellation token, so
    /// shutting one down leaves the app and later services usable.
    pub fn start_service(&self) -> ForwarderService {
        let token = self.dispatcher.cancellation_token().child_token();
        ForwarderService::start(self.dispatcher.clone().with_cancellation(token))
    }

    pub async fn create_destination(&self, destination: Destination) -> AppResult<i64> {
        let id = self.destinations.insert_destination(destination).await?;
        info!(destination_id = id, "Destination created");
        Ok(id)
    }

    pub async fn update_destination(&self, destination: Destination) -> AppResult<()> {
        self.destinations.update_destination(destination).await
    }

    /// Delete a destination together with its rules.
    pub async fn delete_destination(&self, id: i64) -> AppResult<()> {
        if !self.destinations.delete_destination(id).await? {
            return Err(AppError::DestinationNotFound { id });
        }
        info!(destination_id = id, "Destination deleted");
        Ok(())
    }

    /// Flip the enabled flag and return the updated destination.
    pub async fn toggle_destination(&self, id: i64) -> AppResult<Destination> {
        let mut destination = self
            .destinations
            .get_destination(id)
            .await?
            .ok_or(AppError::DestinationNotFound { id })?;
        destination.enabled = !destination.enabled;
        self.destinations.update_destination(destination).await?;

        self.destinations
            .get_destination(id)
            .await?
            .ok_or(AppError::DestinationNotFound { id })
    }

    /// Problems with a rule that do not prevent saving it.
    pub fn rule_warnings(&self, rule: &TriggerRule) -> Vec<String> {
        let mut warnings = Vec::new();
        if let Err(e) = self.matcher.validate_pattern(rule) {
            warnings.push(format!("{e}; the rule will never match"));
        }
        if rule.has_inverted_priority_range() {
            warnings.push(format!(
                "min priority {} is above max priority {}; the rule will never match",
                rule.min_priority, rule.max_priority
            ));
        }
        warnings
    }

    /// Save a new rule. A malformed pattern is logged but does not block saving.
    pub async fn create_rule(&self, rule: TriggerRule) -> AppResult<i64> {
        if let Err(e) = self.matcher.validate_pattern(&rule) {
            warn!(destination_id = rule.destination_id, "Saving rule with invalid pattern: {}", e);
        }
        self.destinations.insert_rule(rule).await
    }

    pub async fn update_rule(&self, rule: TriggerRule) -> AppResult<()> {
        if let Err(e) = self.matcher.validate_pattern(&rule) {
            warn!(rule_id = rule.id, "Saving rule with invalid pattern: {}", e);
        }
        self.destinations.update_rule(rule).await
    }

    pub async fn delete_rule(&self, id: i64) -> AppResult<()> {
        if !self.destinations.delete_rule(id).await? {
            return Err(AppError::RuleNotFound { id });
        }
        Ok(())
    }

    /// Flip the enabled flag and return the updated rule.
    pub async fn toggle_rule(&self, id: i64) -> AppResult<TriggerRule> {
        let mut rule = self
            .destinations
            .get_rule(id)
            .await?
            .ok_or(AppError::RuleNotFound { id })?;
        rule.enabled = !rule.enabled;
        self.destinations.update_rule(rule.clone()).await?;
        Ok(rule)
    }

    /// Currently shown notifications that would be forwarded to `destination_id`.
    pub async fn preview(&self, destination_id: i64) -> AppResult<Vec<NotificationEvent>> {
        if self.destinations.get_destination(destination_id).await?.is_none() {
            return Err(AppError::DestinationNotFound { id: destination_id });
        }
        let rules = self.destinations.list_rules(destination_id).await?;
        Ok(self.active.preview(&rules))
    }
}
