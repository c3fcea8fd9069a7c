//! Send one event and report the outcome
//!
//! Exit status is 0 when the service acknowledged the event (or on
//! `--dry-run`), 1 on any failure.

use colored::*;
use eyre::{Context, Result};

use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::event::{Event, ExtraFields, Notification};
use crate::notifier::{Acknowledgment, EventNotifier, NotifyError};

pub fn run(title: &str, cli: &Cli, config: &Config) -> Result<()> {
    let format = OutputFormat::resolve(cli.format);
    let notification = build_notification(title, cli);

    let mut server = config.server.clone();
    if let Some(url) = &cli.server {
        server.url = url.clone();
    }
    if let Some(secs) = cli.timeout {
        server.timeout_secs = secs;
    }
    log::debug!("Resolved server config: {:?}", server);

    let notifier = EventNotifier::new(server);

    if cli.dry_run {
        let event = notifier.build_event(&notification);
        log::info!("Dry run, not sending event {} to {}", event.id, notifier.endpoint());
        return print_event(&event, notifier.endpoint(), format);
    }

    match notifier.notify(&notification) {
        Ok(ack) => print_acknowledgment(&ack, format),
        Err(err) => {
            log::error!("Notification failed: {}", err);
            eprintln!("{} {}", "✗".red(), describe_error(&err, notifier.endpoint()));
            std::process::exit(1);
        }
    }
}

/// Collect the positional arguments and field flags into a request
pub fn build_notification(title: &str, cli: &Cli) -> Notification {
    let mut notification = Notification::new(title);

    if let Some(event_type) = &cli.event_type {
        notification = notification.event_type(event_type);
    }
    if let Some(priority) = &cli.priority {
        notification = notification.priority(priority);
    }
    if let Some(body) = &cli.body {
        notification = notification.body(body);
    }
    if let Some(url) = &cli.url {
        notification = notification.url(url);
    }
    if let Some(actor) = &cli.actor {
        notification = notification.actor(actor);
    }
    if !cli.tags.is_empty() {
        notification = notification.tags(cli.tags.iter().cloned());
    }
    if cli.action_required {
        notification = notification.action_required(true);
    }
    if let Some(group_key) = &cli.group_key {
        notification = notification.group_key(group_key);
    }
    if let Some(expires_at) = &cli.expires_at {
        notification = notification.expires_at(expires_at);
    }
    if !cli.metadata.is_empty() {
        let metadata: ExtraFields = cli.metadata.iter().cloned().collect();
        notification = notification.metadata(metadata);
    }

    // --field entries go last so they can replace any of the above
    let fields: ExtraFields = cli.fields.iter().cloned().collect();
    notification.fields(fields)
}

fn print_acknowledgment(ack: &Acknowledgment, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(ack)?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(ack)?);
        }
        OutputFormat::Text => {
            println!(
                "{} Accepted {} event(s): {}",
                "✓".green(),
                ack.accepted,
                ack.event_ids.join(", ").cyan()
            );
        }
    }
    Ok(())
}

fn print_event(event: &Event, endpoint: &str, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(event).context("Failed to serialize event")?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(event).context("Failed to serialize event")?);
        }
        OutputFormat::Text => {
            println!("{} Would POST to {}", "→".blue(), endpoint.cyan());
            println!("{}", serde_json::to_string_pretty(event).context("Failed to serialize event")?);
        }
    }
    Ok(())
}

/// One-line diagnostic for stderr
fn describe_error(err: &NotifyError, endpoint: &str) -> String {
    match err {
        NotifyError::Transport { message, timed_out: true } => {
            format!("Timed out sending event to {}: {}", endpoint, message)
        }
        NotifyError::Transport { message, .. } => {
            format!("Could not reach {}: {}", endpoint, message)
        }
        NotifyError::Protocol { status, body } => {
            let hint = match status {
                401 | 403 => " (check BREAKPOINT_API_TOKEN)",
                400..=499 => " (event rejected)",
                _ => "",
            };
            match body {
                Some(body) => format!("Service returned HTTP {}{}: {}", status, hint, body.trim()),
                None => format!("Service returned HTTP {}{}", status, hint),
            }
        }
        NotifyError::Decode { message, .. } => {
            format!("Unexpected response from {}: {}", endpoint, message)
        }
    }
}
