use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{DeviceInfo, RetryPolicy, WebhookPayload, WebhookTransport};
use crate::errors::{AppError, AppResult};
use crate::matcher::TriggerMatcher;
use crate::model::{DeliveryRecord, Destination, NotificationEvent};
use crate::store::{DeliveryLog, DestinationStore};

/// Error message recorded when shutdown interrupts a delivery.
pub const CANCELLED_MESSAGE: &str = "delivery cancelled before completion";

/// Knobs shared by every delivery.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub retry: RetryPolicy,
    /// Characters of the response body kept in the delivery record
    pub response_excerpt_chars: usize,
    pub device: DeviceInfo,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            response_excerpt_chars: 500,
            device: DeviceInfo::from_host(),
        }
    }
}

/// Final state of the attempt loop for one destination.
#[derive(Debug, Default)]
struct AttemptOutcome {
    attempts: u32,
    status: Option<u16>,
    success: bool,
    error: Option<String>,
    body: Option<String>,
}

impl AttemptOutcome {
    fn cancelled(mut self) -> Self {
        self.success = false;
        self.error = Some(CANCELLED_MESSAGE.to_string());
        self
    }
}

/// Fans an event out to every enabled destination whose rules accept it.
///
/// Each destination is handled in its own task: a slow or failing endpoint
/// never delays the others. Every destination that gets at least one send
/// attempt produces exactly one [`DeliveryRecord`].
#[derive(Clone)]
pub struct WebhookDispatcher {
    destinations: Arc<dyn DestinationStore>,
    log: DeliveryLog,
    transport: Arc<dyn WebhookTransport>,
    matcher: TriggerMatcher,
    settings: Arc<DispatchSettings>,
    cancel: CancellationToken,
}

impl WebhookDispatcher {
    pub fn new(
        destinations: Arc<dyn DestinationStore>,
        log: DeliveryLog,
        transport: Arc<dyn WebhookTransport>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            destinations,
            log,
            transport,
            matcher: TriggerMatcher::new(),
            settings: Arc::new(settings),
            cancel: CancellationToken::new(),
        }
    }

    /// Use `token` to interrupt in-flight deliveries.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Deliver `event` to all matching destinations and return the records written.
    ///
    /// Only a failure to list destinations is returned as an error; per
    /// destination problems are logged and recorded.
    pub async fn process_event(&self, event: &NotificationEvent) -> AppResult<Vec<DeliveryRecord>> {
        let destinations = self.destinations.list_enabled_destinations().await.map_err(|e| {
            error!(category = e.category(), "Failed to load destinations: {}", e);
            e
        })?;

        if destinations.is_empty() {
            debug!("No enabled destinations for {}", event.package_name());
            return Ok(Vec::new());
        }

        let event = Arc::new(event.clone());
        let mut tasks = JoinSet::new();
        for destination in destinations {
            let dispatcher = self.clone();
            let event = Arc::clone(&event);
            tasks.spawn(async move { dispatcher.process_destination(&event, destination).await });
        }

        let mut records = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => error!("Destination task failed: {}", e),
            }
        }

        Ok(records)
    }

    async fn process_destination(
        &self,
        event: &NotificationEvent,
        destination: Destination,
    ) -> Option<DeliveryRecord> {
        let rules = match self.destinations.list_rules(destination.id).await {
            Ok(rules) => rules,
            Err(e) => {
                warn!(destination_id = destination.id, "Failed to load trigger rules: {}", e);
                return None;
            }
        };

        if !self.matcher.matches_any(event, &rules) {
            debug!(
                destination_id = destination.id,
                package = event.package_name(),
                "No trigger rule matched"
            );
            return None;
        }

        let payload = WebhookPayload::new(event, &self.settings.device);
        let outcome = self.deliver(&destination, &payload).await;
        debug!(
            destination_id = destination.id,
            attempts = outcome.attempts,
            success = outcome.success,
            "Delivery finished"
        );

        let mut record = DeliveryRecord::for_event(&destination, event);
        record.http_status_code = outcome.status;
        record.success = outcome.success;
        record.error_message = outcome.error;
        record.response_body = outcome.body;

        match self.log.record(record.clone()).await {
            Ok(id) => record.id = id,
            Err(e) => error!(destination_id = destination.id, "Failed to write delivery record: {}", e),
        }

        Some(record)
    }

    /// Attempt loop: 2xx stops with success, 4xx stops without retrying,
    /// anything else is retried until attempts run out.
    async fn deliver(&self, destination: &Destination, payload: &WebhookPayload) -> AttemptOutcome {
        let policy = &self.settings.retry;
        let max_attempts = policy.attempts();
        let mut outcome = AttemptOutcome::default();

        for attempt in 1..=max_attempts {
            let sent = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return outcome.cancelled(),
                sent = self.transport.send(&destination.url, &destination.headers, payload) => sent,
            };
            outcome.attempts = attempt;

            let retryable = match sent {
                Ok(response) => {
                    outcome.status = Some(response.status);
                    outcome.body = Some(excerpt(&response.body, self.settings.response_excerpt_chars));

                    if (200..300).contains(&response.status) {
                        outcome.success = true;
                        outcome.error = None;
                        info!(
                            destination_id = destination.id,
                            status = response.status,
                            attempt,
                            "Webhook delivered"
                        );
                        return outcome;
                    }

                    let failure = AppError::HttpStatus {
                        status_code: response.status,
                        reason: status_reason(response.status),
                    };
                    outcome.error = Some(failure.to_string());
                    failure.is_retryable()
                }
                Err(e) => {
                    outcome.error = Some(e.to_string());
                    e.is_retryable()
                }
            };

            warn!(
                destination_id = destination.id,
                attempt,
                max_attempts,
                retryable,
                "Webhook attempt failed: {}",
                outcome.error.as_deref().unwrap_or_default()
            );

            if !retryable || attempt == max_attempts {
                break;
            }

            let delay = policy.delay_for(attempt);
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return outcome.cancelled(),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        outcome
    }
}

fn status_reason(status: u16) -> String {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown Status")
        .to_string()
}

/// First `max_chars` characters of `body`, never splitting a character.
fn excerpt(body: &str, max_chars: usize) -> String {
    body.chars().take(max_chars).collect()
}
