//! Matching, retry and logging pipeline against a scripted transport

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use notification_forwarder::app::ForwarderApp;
use notification_forwarder::delivery::{
    DeviceInfo, DispatchSettings, RetryPolicy, TransportResponse, WebhookPayload, WebhookTransport, CANCELLED_MESSAGE,
};
use notification_forwarder::errors::{AppError, AppResult};
use notification_forwarder::model::{Destination, NotificationEvent, RecordFilter, TriggerRule};
use notification_forwarder::store::{
    DestinationSnapshot, DestinationStore, MemoryDeliveryLogStore, MemoryDestinationStore,
};
use tokio::sync::watch;
use tokio::time::Instant;

#[derive(Debug, Clone)]
enum Reply {
    Status(u16, &'static str),
    Refused,
    Hang,
}

#[derive(Debug, Clone)]
struct Call {
    url: String,
    headers: BTreeMap<String, String>,
    payload: WebhookPayload,
    at: Instant,
}

/// Replies from a script; once exhausted every call gets the fallback.
struct ScriptedTransport {
    script: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedTransport {
    fn new(script: Vec<Reply>, fallback: Reply) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn always(reply: Reply) -> Arc<Self> {
        Self::new(Vec::new(), reply)
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebhookTransport for ScriptedTransport {
    async fn send(
        &self,
        url: &str,
        headers: &BTreeMap<String, String>,
        payload: &WebhookPayload,
    ) -> AppResult<TransportResponse> {
        self.calls.lock().unwrap().push(Call {
            url: url.to_string(),
            headers: headers.clone(),
            payload: payload.clone(),
            at: Instant::now(),
        });
        let reply = self.script.lock().unwrap().pop_front().unwrap_or_else(|| self.fallback.clone());

        match reply {
            Reply::Status(status, body) => Ok(TransportResponse {
                status,
                body: body.to_string(),
            }),
            Reply::Refused => Err(AppError::HttpRequest {
                method: "POST".to_string(),
                url: url.to_string(),
                source: None,
            }),
            Reply::Hang => std::future::pending().await,
        }
    }
}

fn device() -> DeviceInfo {
    DeviceInfo {
        android_version: "14".to_string(),
        device_model: "Pixel 8".to_string(),
        device_manufacturer: "Google".to_string(),
    }
}

fn settings(base_delay_ms: u64) -> DispatchSettings {
    DispatchSettings {
        retry: RetryPolicy::linear(3, base_delay_ms),
        response_excerpt_chars: 500,
        device: device(),
    }
}

fn app_with(transport: Arc<ScriptedTransport>, base_delay_ms: u64, cap: usize) -> ForwarderApp {
    ForwarderApp::from_parts(
        Arc::new(MemoryDestinationStore::new()),
        Arc::new(MemoryDeliveryLogStore::new()),
        transport,
        settings(base_delay_ms),
        cap,
    )
}

fn event() -> NotificationEvent {
    NotificationEvent::builder("com.example.mail", "Mail")
        .title("Urgent message")
        .text("This is urgent!")
        .priority(1)
        .timestamp(1_700_000_000_000)
        .build()
}

async fn destination_with_rule(app: &ForwarderApp, url: &str, rule: TriggerRule) -> i64 {
    let id = app.create_destination(Destination::new(url)).await.unwrap();
    app.create_rule(TriggerRule { destination_id: id, ..rule }).await.unwrap();
    id
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let transport = ScriptedTransport::always(Reply::Status(404, "no such hook"));
    let app = app_with(transport.clone(), 10, 1000);
    destination_with_rule(&app, "https://hooks.example.com/a", TriggerRule::new(0)).await;

    let records = app.dispatcher().process_event(&event()).await.unwrap();

    assert_eq!(transport.calls().len(), 1);
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert!(!record.success);
    assert_eq!(record.http_status_code, Some(404));
    assert_eq!(record.error_message.as_deref(), Some("HTTP 404: Not Found"));
    assert_eq!(record.response_body.as_deref(), Some("no such hook"));
}

#[tokio::test(start_paused = true)]
async fn test_server_errors_are_retried_with_growing_delay() {
    let transport = ScriptedTransport::new(
        vec![Reply::Status(500, "boom"), Reply::Status(500, "boom")],
        Reply::Status(200, "ok"),
    );
    let app = app_with(transport.clone(), 1000, 1000);
    destination_with_rule(&app, "https://hooks.example.com/a", TriggerRule::new(0)).await;

    let records = app.dispatcher().process_event(&event()).await.unwrap();

    let calls = transport.calls();
    assert_eq!(calls.len(), 3);
    let first_wait = calls[1].at - calls[0].at;
    let second_wait = calls[2].at - calls[1].at;
    assert_eq!(first_wait, Duration::from_millis(1000));
    assert_eq!(second_wait, Duration::from_millis(2000));
    assert!(second_wait > first_wait);

    let record = &records[0];
    assert!(record.success);
    assert_eq!(record.http_status_code, Some(200));
    assert_eq!(record.error_message, None);
    assert_eq!(record.response_body.as_deref(), Some("ok"));
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_keep_last_failure() {
    let transport = ScriptedTransport::new(vec![Reply::Status(503, "busy")], Reply::Refused);
    let app = app_with(transport.clone(), 10, 1000);
    destination_with_rule(&app, "https://hooks.example.com/a", TriggerRule::new(0)).await;

    let records = app.dispatcher().process_event(&event()).await.unwrap();

    assert_eq!(transport.calls().len(), 3);
    let record = &records[0];
    assert!(!record.success);
    assert_eq!(record.http_status_code, Some(503));
    assert!(record
        .error_message
        .as_deref()
        .unwrap()
        .starts_with("HTTP request failed"));
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_destination_still_recorded() {
    let transport = ScriptedTransport::always(Reply::Refused);
    let app = app_with(transport.clone(), 10, 1000);
    destination_with_rule(&app, "https://hooks.example.com/a", TriggerRule::new(0)).await;

    app.dispatcher().process_event(&event()).await.unwrap();

    let stored = app.delivery_log().recent(&RecordFilter::All).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].http_status_code, None);
    assert!(!stored[0].success);
    assert!(stored[0].id > 0);
}

#[tokio::test]
async fn test_destination_without_rules_gets_nothing() {
    let transport = ScriptedTransport::always(Reply::Status(200, "ok"));
    let app = app_with(transport.clone(), 10, 1000);
    app.create_destination(Destination::new("https://hooks.example.com/a")).await.unwrap();

    let records = app.dispatcher().process_event(&event()).await.unwrap();

    assert!(records.is_empty());
    assert!(transport.calls().is_empty());
    assert_eq!(app.delivery_log().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_disabled_rules_and_destinations_are_skipped() {
    let transport = ScriptedTransport::always(Reply::Status(200, "ok"));
    let app = app_with(transport.clone(), 10, 1000);

    destination_with_rule(&app, "https://hooks.example.com/a", TriggerRule::new(0).with_enabled(false)).await;
    let disabled = destination_with_rule(&app, "https://hooks.example.com/b", TriggerRule::new(0)).await;
    app.toggle_destination(disabled).await.unwrap();

    let records = app.dispatcher().process_event(&event()).await.unwrap();
    assert!(records.is_empty());
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_fan_out_only_to_matching_destinations() {
    let transport = ScriptedTransport::always(Reply::Status(200, "ok"));
    let app = app_with(transport.clone(), 10, 1000);

    destination_with_rule(&app, "https://hooks.example.com/mail", TriggerRule::new(0).with_package_filter("mail")).await;
    destination_with_rule(&app, "https://hooks.example.com/bank", TriggerRule::new(0).with_package_filter("bank")).await;
    destination_with_rule(&app, "https://hooks.example.com/urgent", TriggerRule::new(0).with_content_regex(".*URGENT.*"))
        .await;

    let mut records = app.dispatcher().process_event(&event()).await.unwrap();
    records.sort_by(|a, b| a.destination_url.cmp(&b.destination_url));

    let urls: Vec<_> = records.iter().map(|r| r.destination_url.as_str()).collect();
    assert_eq!(urls, vec!["https://hooks.example.com/mail", "https://hooks.example.com/urgent"]);
    assert_eq!(transport.calls().len(), 2);
    assert_eq!(app.delivery_log().count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_payload_and_headers_reach_transport() {
    let transport = ScriptedTransport::always(Reply::Status(204, ""));
    let app = app_with(transport.clone(), 10, 1000);
    let id = app
        .create_destination(Destination::new("https://hooks.example.com/a").with_header("Authorization", "Bearer t"))
        .await
        .unwrap();
    app.create_rule(TriggerRule::new(id)).await.unwrap();

    app.dispatcher().process_event(&event()).await.unwrap();

    let call = &transport.calls()[0];
    assert_eq!(call.url, "https://hooks.example.com/a");
    assert_eq!(call.headers.get("Authorization").map(String::as_str), Some("Bearer t"));
    assert_eq!(call.payload.package_name, "com.example.mail");
    assert_eq!(call.payload.title.as_deref(), Some("Urgent message"));
    assert_eq!(call.payload.sub_text, None);
    assert_eq!(call.payload.device, device());
}

#[tokio::test]
async fn test_response_body_is_truncated() {
    let long_body: &'static str = Box::leak("x".repeat(2000).into_boxed_str());
    let transport = ScriptedTransport::always(Reply::Status(200, long_body));
    let app = app_with(transport, 10, 1000);
    destination_with_rule(&app, "https://hooks.example.com/a", TriggerRule::new(0)).await;

    let records = app.dispatcher().process_event(&event()).await.unwrap();
    assert_eq!(records[0].response_body.as_ref().unwrap().chars().count(), 500);
}

#[tokio::test]
async fn test_retention_cap_applies_to_dispatched_records() {
    let transport = ScriptedTransport::always(Reply::Status(200, "ok"));
    let app = app_with(transport, 10, 2);
    destination_with_rule(&app, "https://hooks.example.com/a", TriggerRule::new(0)).await;

    for _ in 0..5 {
        app.dispatcher().process_event(&event()).await.unwrap();
    }
    assert_eq!(app.delivery_log().count().await.unwrap(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_records_cancelled_outcome() {
    let transport = ScriptedTransport::always(Reply::Hang);
    let app = app_with(transport, 10, 1000);
    destination_with_rule(&app, "https://hooks.example.com/a", TriggerRule::new(0)).await;

    let dispatcher = app.dispatcher().clone();
    let token = dispatcher.cancellation_token();
    let running = tokio::spawn(async move { dispatcher.process_event(&event()).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    token.cancel();

    let records = running.await.unwrap().unwrap();
    assert_eq!(records.len(), 1);
    assert!(!records[0].success);
    assert_eq!(records[0].error_message.as_deref(), Some(CANCELLED_MESSAGE));
    assert_eq!(app.delivery_log().count().await.unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_during_retry_wait() {
    let transport = ScriptedTransport::always(Reply::Status(500, "boom"));
    let app = app_with(transport.clone(), 60_000, 1000);
    destination_with_rule(&app, "https://hooks.example.com/a", TriggerRule::new(0)).await;

    let dispatcher = app.dispatcher().clone();
    let token = dispatcher.cancellation_token();
    let running = tokio::spawn(async move { dispatcher.process_event(&event()).await });

    tokio::time::sleep(Duration::from_secs(1)).await;
    token.cancel();

    let records = running.await.unwrap().unwrap();
    assert_eq!(transport.calls().len(), 1);
    assert_eq!(records[0].http_status_code, Some(500));
    assert_eq!(records[0].error_message.as_deref(), Some(CANCELLED_MESSAGE));
}

#[tokio::test]
async fn test_service_forwards_queued_events() {
    let transport = ScriptedTransport::always(Reply::Status(200, "ok"));
    let app = app_with(transport.clone(), 10, 1000);
    destination_with_rule(&app, "https://hooks.example.com/a", TriggerRule::new(0)).await;

    let service = app.start_service();
    for _ in 0..3 {
        service.submit(event()).unwrap();
    }
    service.finish().await.unwrap();

    assert_eq!(transport.calls().len(), 3);
    assert_eq!(app.delivery_log().count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_app_keeps_forwarding_after_service_shutdown() {
    let transport = ScriptedTransport::always(Reply::Status(200, "ok"));
    let app = app_with(transport.clone(), 10, 1000);
    destination_with_rule(&app, "https://hooks.example.com/a", TriggerRule::new(0)).await;

    app.start_service().shutdown().await.unwrap();

    let restarted = app.start_service();
    restarted.submit(event()).unwrap();
    restarted.finish().await.unwrap();

    let direct = app.dispatcher().process_event(&event()).await.unwrap();
    assert!(direct[0].success);

    assert_eq!(transport.calls().len(), 2);
    let stored = app.delivery_log().recent(&RecordFilter::All).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|r| r.success && r.error_message.is_none()));
}

#[tokio::test(start_paused = true)]
async fn test_service_shutdown_cancels_in_flight_delivery() {
    let transport = ScriptedTransport::always(Reply::Hang);
    let app = app_with(transport, 10, 1000);
    destination_with_rule(&app, "https://hooks.example.com/a", TriggerRule::new(0)).await;

    let service = app.start_service();
    service.submit(event()).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    service.shutdown().await.unwrap();

    let records = app.delivery_log().recent(&RecordFilter::All).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].error_message.as_deref(), Some(CANCELLED_MESSAGE));
}

/// Destination store that can fail listing, or rule loading for one destination.
struct FaultyStore {
    inner: MemoryDestinationStore,
    fail_listing: bool,
    fail_rules_for: AtomicI64,
}

impl FaultyStore {
    fn new(fail_listing: bool) -> Self {
        Self {
            inner: MemoryDestinationStore::new(),
            fail_listing,
            fail_rules_for: AtomicI64::new(0),
        }
    }
}

#[async_trait]
impl DestinationStore for FaultyStore {
    async fn list_destinations(&self) -> AppResult<Vec<Destination>> {
        if self.fail_listing {
            return Err(AppError::storage("store offline"));
        }
        self.inner.list_destinations().await
    }
    async fn list_enabled_destinations(&self) -> AppResult<Vec<Destination>> {
        if self.fail_listing {
            return Err(AppError::storage("store offline"));
        }
        self.inner.list_enabled_destinations().await
    }
    async fn get_destination(&self, id: i64) -> AppResult<Option<Destination>> {
        self.inner.get_destination(id).await
    }
    async fn insert_destination(&self, destination: Destination) -> AppResult<i64> {
        self.inner.insert_destination(destination).await
    }
    async fn update_destination(&self, destination: Destination) -> AppResult<()> {
        self.inner.update_destination(destination).await
    }
    async fn delete_destination(&self, id: i64) -> AppResult<bool> {
        self.inner.delete_destination(id).await
    }
    async fn list_rules(&self, destination_id: i64) -> AppResult<Vec<TriggerRule>> {
        if self.fail_rules_for.load(Ordering::SeqCst) == destination_id {
            return Err(AppError::storage("rules unavailable"));
        }
        self.inner.list_rules(destination_id).await
    }
    async fn get_rule(&self, id: i64) -> AppResult<Option<TriggerRule>> {
        self.inner.get_rule(id).await
    }
    async fn insert_rule(&self, rule: TriggerRule) -> AppResult<i64> {
        self.inner.insert_rule(rule).await
    }
    async fn update_rule(&self, rule: TriggerRule) -> AppResult<()> {
        self.inner.update_rule(rule).await
    }
    async fn delete_rule(&self, id: i64) -> AppResult<bool> {
        self.inner.delete_rule(id).await
    }
    async fn list_enabled_rules(&self) -> AppResult<Vec<TriggerRule>> {
        self.inner.list_enabled_rules().await
    }
    async fn count_destinations(&self) -> AppResult<usize> {
        self.inner.count_destinations().await
    }
    fn subscribe(&self) -> watch::Receiver<DestinationSnapshot> {
        self.inner.subscribe()
    }
}

fn app_over(store: Arc<FaultyStore>, transport: Arc<ScriptedTransport>) -> ForwarderApp {
    ForwarderApp::from_parts(store, Arc::new(MemoryDeliveryLogStore::new()), transport, settings(10), 1000)
}

#[tokio::test]
async fn test_listing_failure_aborts_fan_out() {
    let transport = ScriptedTransport::always(Reply::Status(200, "ok"));
    let app = app_over(Arc::new(FaultyStore::new(true)), transport.clone());
    destination_with_rule(&app, "https://hooks.example.com/a", TriggerRule::new(0)).await;

    let result = app.dispatcher().process_event(&event()).await;
    assert!(matches!(result, Err(AppError::Storage { .. })));
    assert!(transport.calls().is_empty());
    assert_eq!(app.delivery_log().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_rule_failure_skips_only_that_destination() {
    let transport = ScriptedTransport::always(Reply::Status(200, "ok"));
    let store = Arc::new(FaultyStore::new(false));
    let app = app_over(store.clone(), transport.clone());
    let broken = destination_with_rule(&app, "https://hooks.example.com/broken", TriggerRule::new(0)).await;
    let healthy = destination_with_rule(&app, "https://hooks.example.com/healthy", TriggerRule::new(0)).await;
    store.fail_rules_for.store(broken, Ordering::SeqCst);

    let records = app.dispatcher().process_event(&event()).await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].destination_id, healthy);
    assert!(records[0].success);

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].url, "https://hooks.example.com/healthy");

    let stored = app.delivery_log().recent(&RecordFilter::All).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert!(stored.iter().all(|r| r.destination_id != broken));
}
