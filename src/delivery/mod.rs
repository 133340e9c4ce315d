//! Webhook delivery: payload construction, HTTP transport, retry and fan-out.

pub mod dispatcher;
pub mod payload;
pub mod retry;
pub mod transport;

pub use dispatcher::{DispatchSettings, WebhookDispatcher, CANCELLED_MESSAGE};
pub use payload::{DeviceInfo, WebhookPayload};
pub use retry::RetryPolicy;
pub use transport::{HttpTransport, TransportResponse, WebhookTransport};
