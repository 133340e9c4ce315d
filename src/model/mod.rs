//! Data model shared by the matcher, the stores and the dispatcher.

pub mod destination;
pub mod event;
pub mod record;
pub mod rule;

pub use destination::Destination;
pub use event::{NotificationEvent, NotificationEventBuilder, PRIORITY_MAX, PRIORITY_MIN};
pub use record::{DeliveryRecord, RecordFilter};
pub use rule::{PatternMode, TriggerRule};
