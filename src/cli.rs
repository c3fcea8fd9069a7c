use clap::{Parser, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl OutputFormat {
    /// Resolve the effective output format.
    /// If user specified a format, use it.
    /// Otherwise: TTY → Text, non-TTY (pipe) → Json
    pub fn resolve(user_choice: Option<OutputFormat>) -> OutputFormat {
        match user_choice {
            Some(fmt) => fmt,
            None => {
                if std::io::stdout().is_terminal() {
                    OutputFormat::Text
                } else {
                    OutputFormat::Json
                }
            }
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "breakpoint-notify",
    about = "Send an event to a Breakpoint ingestion service",
    version,
    after_help = "Environment: BREAKPOINT_URL (default http://localhost:8080), BREAKPOINT_API_TOKEN\n\nLogs are written to: ~/.local/share/breakpoint-notify/logs/breakpoint-notify.log"
)]
pub struct Cli {
    /// Short display title for the event
    pub title: Option<String>,

    /// Event type, e.g. pipeline.failed (default: custom)
    pub event_type: Option<String>,

    /// Priority tier: ambient, notice, urgent, critical (default: ambient)
    pub priority: Option<String>,

    /// Longer description
    #[arg(long)]
    pub body: Option<String>,

    /// Link to the thing the event is about
    #[arg(long)]
    pub url: Option<String>,

    /// Who or what caused the event
    #[arg(long)]
    pub actor: Option<String>,

    /// Tag to attach (repeatable)
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Mark the event as needing someone to act on it
    #[arg(long)]
    pub action_required: bool,

    /// Key the service uses to group related events
    #[arg(long)]
    pub group_key: Option<String>,

    /// RFC 3339 time after which the event is stale
    #[arg(long)]
    pub expires_at: Option<String>,

    /// Metadata entry as KEY=VALUE (repeatable, VALUE may be JSON)
    #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub metadata: Vec<(String, serde_json::Value)>,

    /// Extra top-level event field as KEY=VALUE (repeatable, VALUE may be JSON)
    #[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub fields: Vec<(String, serde_json::Value)>,

    /// Service base URL (overrides BREAKPOINT_URL and config)
    #[arg(long, value_name = "URL")]
    pub server: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Print the event instead of sending it
    #[arg(long)]
    pub dry_run: bool,

    /// Output format (default: text for TTY, json for pipes)
    #[arg(long, short = 'o', value_enum)]
    pub format: Option<OutputFormat>,

    /// Path to config file
    #[arg(short, long, help = "Path to notify.yaml config file")]
    pub config: Option<PathBuf>,

    /// Generate shell completions and exit
    #[arg(long, value_name = "SHELL", exclusive = true)]
    pub completions: Option<clap_complete::Shell>,
}

/// Parse `KEY=VALUE`. VALUE is read as JSON when it parses, otherwise kept as a string.
pub fn parse_key_value(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", raw));
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
