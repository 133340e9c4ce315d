//! `ingest` and `preview`: commands that consume notification events from stdin.

use anyhow::{Context, Result};
use notification_forwarder::app::ForwarderApp;
use notification_forwarder::model::NotificationEvent;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

pub struct ForwardHandler<'a> {
    app: &'a ForwarderApp,
}

impl<'a> ForwardHandler<'a> {
    pub fn new(app: &'a ForwarderApp) -> Self {
        Self { app }
    }

    /// Queue every event read from `reader`, then wait for all deliveries.
    ///
    /// Ctrl-C cancels outstanding deliveries; they are recorded as cancelled.
    pub async fn handle_ingest<R: AsyncBufRead + Unpin>(&self, reader: R) -> Result<()> {
        let service = self.app.start_service();
        let cancel = service.cancellation_token();
        let mut lines = reader.lines();
        let mut submitted = 0usize;
        let mut skipped = 0usize;

        loop {
            let line = tokio::select! {
                line = lines.next_line() => line.context("Failed to read events from stdin")?,
                _ = tokio::signal::ctrl_c() => {
                    warn!("Interrupted while reading events");
                    cancel.cancel();
                    break;
                }
            };
            let Some(line) = line else { break };

            match parse_event_line(&line) {
                Some(Ok(event)) => {
                    service.submit(event)?;
                    submitted += 1;
                }
                Some(Err(e)) => {
                    warn!("Skipping malformed event: {}", e);
                    skipped += 1;
                }
                None => {}
            }
        }

        let finish = service.finish();
        tokio::pin!(finish);
        tokio::select! {
            result = &mut finish => result?,
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, cancelling outstanding deliveries");
                cancel.cancel();
                finish.await?;
            }
        }

        info!("Ingest finished: {} submitted, {} skipped", submitted, skipped);
        println!("Forwarded {submitted} events ({skipped} skipped)");
        Ok(())
    }

    /// Load events as the active notification list and print those the
    /// destination's rules would forward, one JSON object per line.
    pub async fn handle_preview<R: AsyncBufRead + Unpin>(&self, destination_id: i64, reader: R) -> Result<()> {
        let mut lines = reader.lines();
        let mut events = Vec::new();
        while let Some(line) = lines.next_line().await.context("Failed to read events from stdin")? {
            match parse_event_line(&line) {
                Some(Ok(event)) => events.push(event),
                Some(Err(e)) => warn!("Skipping malformed event: {}", e),
                None => {}
            }
        }

        self.app.active().replace(events);
        for event in self.app.preview(destination_id).await? {
            println!("{}", serde_json::to_string(&event)?);
        }
        Ok(())
    }
}

/// `None` for blank lines.
fn parse_event_line(line: &str) -> Option<serde_json::Result<NotificationEvent>> {
    let line = line.trim();
    (!line.is_empty()).then(|| serde_json::from_str(line))
}
