use super::super::LogAction;
use super::format_millis;
use anyhow::Result;
use notification_forwarder::app::ForwarderApp;
use notification_forwarder::model::{DeliveryRecord, RecordFilter};

pub struct LogHandler<'a> {
    app: &'a ForwarderApp,
}

impl<'a> LogHandler<'a> {
    pub fn new(app: &'a ForwarderApp) -> Self {
        Self { app }
    }

    pub async fn handle(&self, action: LogAction) -> Result<()> {
        let log = self.app.delivery_log();
        match action {
            LogAction::List {
                success,
                failed,
                package,
                limit,
            } => {
                let outcome = match (success, failed) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                };
                let filter = match (&package, outcome) {
                    (Some(package), _) => RecordFilter::Package(package.clone()),
                    (None, Some(success)) => RecordFilter::Success(success),
                    (None, None) => RecordFilter::All,
                };

                let records: Vec<DeliveryRecord> = log
                    .recent(&filter)
                    .await?
                    .into_iter()
                    .filter(|r| outcome.map_or(true, |success| r.success == success))
                    .take(limit)
                    .collect();

                if records.is_empty() {
                    println!("No delivery records");
                }
                for record in &records {
                    println!("{}", format_record(record));
                }
            }
            LogAction::Count => println!("{}", log.count().await?),
            LogAction::Clear => {
                let removed = log.clear().await?;
                println!("Deleted {removed} delivery records");
            }
            LogAction::PruneBefore { timestamp } => {
                let removed = log.delete_older_than(timestamp).await?;
                println!("Deleted {removed} delivery records sent before {}", format_millis(timestamp));
            }
        }
        Ok(())
    }
}

fn format_record(record: &DeliveryRecord) -> String {
    let status = record
        .http_status_code
        .map(|s| s.to_string())
        .unwrap_or_else(|| "-".to_string());
    let mut line = format!(
        "{:>5}  {}  {:<6}  {:>3}  {} -> {}",
        record.id,
        format_millis(record.sent_at),
        if record.success { "OK" } else { "FAILED" },
        status,
        record.package_name,
        record.destination_url
    );
    if let Some(error) = &record.error_message {
        line.push_str("  ");
        line.push_str(error);
    }
    line
}
