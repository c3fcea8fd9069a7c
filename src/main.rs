use clap::Parser;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;

mod cli;
mod commands;
mod config;
mod event;
mod notifier;

use cli::Cli;
use config::{Config, LogLevel};

/// Start file logging before the config is read, so `Config::load` can log.
/// Returns whether `RUST_LOG` controls the filter.
fn setup_logging() -> Result<bool> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("breakpoint-notify")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("breakpoint-notify.log");

    // Log to a file so stdout stays clean for scripts
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    // RUST_LOG env var takes precedence. Otherwise the logger passes everything
    // and the global max level gates records, starting from the default level
    // until the config is loaded.
    let mut builder = env_logger::Builder::new();
    let from_env = std::env::var("RUST_LOG").is_ok();

    if from_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(log::LevelFilter::Trace);
    }

    builder.target(env_logger::Target::Pipe(target)).init();

    if !from_env {
        log::set_max_level(LogLevel::default().to_level_filter());
    }

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(from_env)
}

/// Switch to the configured level once the config is known
fn apply_log_level(log_level: LogLevel, from_env: bool) {
    if from_env {
        info!("Log level: from RUST_LOG env");
    } else {
        log::set_max_level(log_level.to_level_filter());
        info!("Log level: {} (from config)", log_level.as_filter());
    }
}

fn usage() -> String {
    let program = std::env::args().next().unwrap_or_else(|| "breakpoint-notify".to_string());
    format!("Usage: {} <title> [event_type] [priority]", program)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        return commands::completions::run(shell);
    }

    let Some(title) = cli.title.clone() else {
        eprintln!("{}", usage());
        std::process::exit(1);
    };

    let from_env = setup_logging().context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    apply_log_level(config.log_level, from_env);

    info!("Starting breakpoint-notify with config from: {:?}", cli.config);

    commands::notify::run(&title, &cli, &config).context("Command failed")?;

    Ok(())
}
