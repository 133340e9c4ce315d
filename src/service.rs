//! Background forwarding queue.
//!
//! [`ForwarderService::submit`] is the entry point for the observation path:
//! it enqueues the event and returns at once. A single worker task pulls
//! events off the queue and runs one [`WebhookDispatcher::process_event`] per
//! event, so a slow destination never holds up intake.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use flume::{Receiver, Sender};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::delivery::WebhookDispatcher;
use crate::errors::{AppError, AppResult};
use crate::model::NotificationEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopMode {
    /// Process everything already queued, then stop.
    Drain,
    /// Interrupt in-flight deliveries and discard queued events.
    Cancel,
}

pub struct ForwarderService {
    sender: Sender<NotificationEvent>,
    stop: Sender<StopMode>,
    queue_size: Arc<AtomicUsize>,
    cancel: CancellationToken,
    worker: JoinHandle<()>,
}

impl ForwarderService {
    /// Spawn the worker on the current tokio runtime.
    pub fn start(dispatcher: WebhookDispatcher) -> Self {
        let (sender, receiver) = flume::unbounded();
        let (stop, stop_receiver) = flume::bounded(1);
        let queue_size = Arc::new(AtomicUsize::new(0));
        let cancel = dispatcher.cancellation_token();

        let worker = Worker {
            dispatcher,
            receiver,
            stop_receiver,
            queue_size: Arc::clone(&queue_size),
            in_flight: JoinSet::new(),
        };
        let worker = tokio::spawn(worker.run());

        Self {
            sender,
            stop,
            queue_size,
            cancel,
            worker,
        }
    }

    /// Queue an event for forwarding. Never waits on delivery.
    pub fn submit(&self, event: NotificationEvent) -> AppResult<()> {
        if self.cancel.is_cancelled() {
            return Err(AppError::internal("forwarder is shutting down"));
        }
        self.queue_size.fetch_add(1, Ordering::Relaxed);
        self.sender.send(event).map_err(|_| {
            self.queue_size.fetch_sub(1, Ordering::Relaxed);
            AppError::internal("forwarder worker has stopped")
        })
    }

    /// Token that interrupts this service's deliveries when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Events queued but not yet picked up by the worker.
    pub fn queued(&self) -> usize {
        self.queue_size.load(Ordering::Relaxed)
    }

    /// Stop intake and wait until every queued event has been delivered.
    pub async fn finish(self) -> AppResult<()> {
        self.stop_with(StopMode::Drain).await
    }

    /// Cancel in-flight deliveries and wait for the worker to exit.
    ///
    /// Deliveries interrupted mid-attempt are still recorded, as cancelled.
    pub async fn shutdown(self) -> AppResult<()> {
        self.cancel.cancel();
        self.stop_with(StopMode::Cancel).await
    }

    async fn stop_with(self, mode: StopMode) -> AppResult<()> {
        // A full stop channel means a stop is already pending.
        let _ = self.stop.try_send(mode);
        self.worker
            .await
            .map_err(|e| AppError::internal(format!("forwarder worker panicked: {e}")))
    }
}

struct Worker {
    dispatcher: WebhookDispatcher,
    receiver: Receiver<NotificationEvent>,
    stop_receiver: Receiver<StopMode>,
    queue_size: Arc<AtomicUsize>,
    in_flight: JoinSet<()>,
}

impl Worker {
    async fn run(mut self) {
        info!("Forwarder worker started");

        let mode = loop {
            tokio::select! {
                biased;

                stop = self.stop_receiver.recv_async() => {
                    break stop.unwrap_or(StopMode::Drain);
                }

                event = self.receiver.recv_async() => match event {
                    Ok(event) => {
                        self.queue_size.fetch_sub(1, Ordering::Relaxed);
                        self.dispatch(event);
                    }
                    Err(_) => break StopMode::Drain,
                },

                Some(joined) = self.in_flight.join_next() => {
                    if let Err(e) = joined {
                        error!("Event task failed: {}", e);
                    }
                }
            }
        };

        match mode {
            StopMode::Drain => {
                info!("Draining forwarder queue");
                while let Ok(event) = self.receiver.try_recv() {
                    self.queue_size.fetch_sub(1, Ordering::Relaxed);
                    self.dispatch(event);
                }
            }
            StopMode::Cancel => {
                let dropped = self.receiver.drain().count();
                self.queue_size.fetch_sub(dropped, Ordering::Relaxed);
                if dropped > 0 {
                    warn!("Discarded {} queued events on shutdown", dropped);
                }
            }
        }

        while let Some(joined) = self.in_flight.join_next().await {
            if let Err(e) = joined {
                error!("Event task failed: {}", e);
            }
        }

        info!("Forwarder worker stopped");
    }

    fn dispatch(&mut self, event: NotificationEvent) {
        debug!("Forwarding event {} from {}", event.key(), event.package_name());
        let dispatcher = self.dispatcher.clone();
        self.in_flight.spawn(async move {
            // Fetch failures are already logged by the dispatcher.
            let _ = dispatcher.process_event(&event).await;
        });
    }
}
