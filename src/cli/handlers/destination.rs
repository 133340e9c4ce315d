use super::super::DestinationAction;
use super::{enabled_label, format_millis};
use anyhow::Result;
use notification_forwarder::app::ForwarderApp;
use notification_forwarder::model::Destination;

pub struct DestinationHandler<'a> {
    app: &'a ForwarderApp,
}

impl<'a> DestinationHandler<'a> {
    pub fn new(app: &'a ForwarderApp) -> Self {
        Self { app }
    }

    pub async fn handle(&self, action: DestinationAction) -> Result<()> {
        match action {
            DestinationAction::Add { url, headers, disabled } => {
                let destination = headers
                    .into_iter()
                    .fold(Destination::new(url.trim()), |d, (name, value)| d.with_header(name, value))
                    .with_enabled(!disabled);
                let id = self.app.create_destination(destination).await?;
                println!("Destination {id} added: {}", url.trim());
            }
            DestinationAction::List => self.list().await?,
            DestinationAction::Remove { id } => {
                self.app.delete_destination(id).await?;
                println!("Destination {id} removed");
            }
            DestinationAction::Toggle { id } => {
                let destination = self.app.toggle_destination(id).await?;
                println!("Destination {id} {}", enabled_label(destination.enabled));
            }
        }
        Ok(())
    }

    async fn list(&self) -> Result<()> {
        let destinations = self.app.destinations().list_destinations().await?;
        if destinations.is_empty() {
            println!("No destinations configured");
            return Ok(());
        }

        for destination in destinations {
            let rules = self.app.destinations().list_rules(destination.id).await?;
            println!(
                "{:>4}  {:<8}  {:>2} rule(s)  {}  {}",
                destination.id,
                enabled_label(destination.enabled),
                rules.len(),
                format_millis(destination.created_at),
                destination.url
            );
            for (name, value) in &destination.headers {
                println!("        {name}: {value}");
            }
        }
        Ok(())
    }
}
