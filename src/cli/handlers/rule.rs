use super::super::RuleAction;
use super::enabled_label;
use anyhow::Result;
use notification_forwarder::app::ForwarderApp;
use notification_forwarder::errors::AppError;
use notification_forwarder::model::{PatternMode, TriggerRule};

pub struct RuleHandler<'a> {
    app: &'a ForwarderApp,
}

impl<'a> RuleHandler<'a> {
    pub fn new(app: &'a ForwarderApp) -> Self {
        Self { app }
    }

    pub async fn handle(&self, action: RuleAction) -> Result<()> {
        match action {
            RuleAction::Add {
                destination_id,
                package,
                content,
                regex,
                min_priority,
                max_priority,
                disabled,
            } => {
                let mut rule = TriggerRule::new(destination_id)
                    .with_priority_range(min_priority, max_priority)
                    .with_enabled(!disabled);
                if let Some(package) = package {
                    rule = rule.with_package_filter(package);
                }
                if let Some(content) = content {
                    rule = if regex {
                        rule.with_content_regex(content)
                    } else {
                        rule.with_content_filter(content)
                    };
                }

                for warning in self.app.rule_warnings(&rule) {
                    eprintln!("warning: {warning}");
                }
                let id = self.app.create_rule(rule).await?;
                println!("Rule {id} added to destination {destination_id}");
            }
            RuleAction::List { destination_id } => self.list(destination_id).await?,
            RuleAction::Remove { id } => {
                self.app.delete_rule(id).await?;
                println!("Rule {id} removed");
            }
            RuleAction::Toggle { id } => {
                let rule = self.app.toggle_rule(id).await?;
                println!("Rule {id} {}", enabled_label(rule.enabled));
            }
        }
        Ok(())
    }

    async fn list(&self, destination_id: i64) -> Result<()> {
        let store = self.app.destinations();
        if store.get_destination(destination_id).await?.is_none() {
            return Err(AppError::DestinationNotFound { id: destination_id }.into());
        }

        let rules = store.list_rules(destination_id).await?;
        if rules.is_empty() {
            println!("Destination {destination_id} has no rules; nothing will be forwarded to it");
            return Ok(());
        }

        for rule in rules {
            let content = match (&rule.content_filter, rule.pattern_mode) {
                (Some(filter), PatternMode::Regex) => format!("regex:{filter}"),
                (Some(filter), PatternMode::Text) => format!("text:{filter}"),
                (None, _) => "*".to_string(),
            };
            println!(
                "{:>4}  {:<8}  package={}  content={}  priority={}..={}",
                rule.id,
                enabled_label(rule.enabled),
                rule.package_filter.as_deref().unwrap_or("*"),
                content,
                rule.min_priority,
                rule.max_priority
            );
        }
        Ok(())
    }
}
