//! Integration tests for the breakpoint-notify binary
//!
//! These tests run the built binary end to end:
//! - Usage errors and exit codes
//! - Dry-run payload output
//! - Submission against a mock ingestion service
//! - Configuration precedence (file, env, flags)

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_breakpoint-notify"))
}

/// Command with config, data and working directories pointed at `home`
fn command(home: &Path) -> Command {
    let mut cmd = Command::new(binary());
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env_remove("BREAKPOINT_URL")
        .env_remove("BREAKPOINT_API_TOKEN")
        .env_remove("BREAKPOINT_TIMEOUT_SECS")
        .env_remove("BREAKPOINT_NOTIFY_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn run(home: &Path, args: &[&str]) -> Output {
    command(home).args(args).output().expect("Failed to execute breakpoint-notify")
}

async fn run_async(cmd: Command) -> Output {
    let mut cmd = cmd;
    tokio::task::spawn_blocking(move || cmd.output().expect("Failed to execute breakpoint-notify"))
        .await
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn unused_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

async fn accepting_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/events"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"accepted": 1, "event_ids": ["evt-1"]})))
        .mount(&server)
        .await;
    server
}

async fn sent_event(server: &MockServer) -> Value {
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1, "expected exactly one submission");
    requests[0].body_json().unwrap()
}

#[test]
fn test_missing_title_prints_usage_and_exits_1() {
    let home = TempDir::new().unwrap();
    let output = run(home.path(), &[]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Usage:"));
    assert!(stderr(&output).contains("<title> [event_type] [priority]"));
}

#[test]
fn test_dry_run_prints_event_without_sending() {
    let home = TempDir::new().unwrap();
    // Nothing listens here; a real send would fail
    let server = format!("http://127.0.0.1:{}", unused_port());
    let output = run(
        home.path(),
        &["Deploy finished", "--dry-run", "-o", "json", "--server", &server, "--tag", "prod"],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let event: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(event["title"], "Deploy finished");
    assert_eq!(event["event_type"], "custom");
    assert_eq!(event["priority"], "ambient");
    assert_eq!(event["source"], "rust-adapter");
    assert_eq!(event["tags"], json!(["prod"]));
    assert!(event["id"].as_str().unwrap().starts_with("rs-"));
}

#[test]
fn test_unreachable_service_exits_1() {
    let home = TempDir::new().unwrap();
    let server = format!("http://127.0.0.1:{}", unused_port());
    let output = run(home.path(), &["Deploy finished", "--server", &server]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Could not reach"));
}

#[test]
fn test_completions_need_no_title() {
    let home = TempDir::new().unwrap();
    let output = run(home.path(), &["--completions", "bash"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("breakpoint-notify"));
}

#[test]
fn test_writes_log_file() {
    let home = TempDir::new().unwrap();
    let output = run(home.path(), &["Logged", "--dry-run"]);
    assert!(output.status.success());

    let log = home
        .path()
        .join("data")
        .join("breakpoint-notify")
        .join("logs")
        .join("breakpoint-notify.log");
    assert!(log.exists());
    assert!(fs::read_to_string(log).unwrap().contains("Dry run"));
}

fn log_contents(home: &Path) -> String {
    let log = home
        .join("data")
        .join("breakpoint-notify")
        .join("logs")
        .join("breakpoint-notify.log");
    fs::read_to_string(log).unwrap_or_default()
}

#[test]
fn test_config_warnings_reach_log_file() {
    let home = TempDir::new().unwrap();
    let config_path = home.path().join("notify.yaml");
    fs::write(&config_path, "server:\n  token: from-file\n").unwrap();

    let output = command(home.path())
        .args(["Hello", "--dry-run", "--config"])
        .arg(&config_path)
        .env("BREAKPOINT_TIMEOUT_SECS", "soon")
        .output()
        .expect("Failed to execute breakpoint-notify");
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let log = log_contents(home.path());
    assert!(log.contains("server.token is set in config file"), "log: {}", log);
    assert!(log.contains("Ignoring invalid BREAKPOINT_TIMEOUT_SECS"), "log: {}", log);
}

#[test]
fn test_config_log_level_filters_after_load() {
    let home = TempDir::new().unwrap();
    let config_path = home.path().join("notify.yaml");
    fs::write(&config_path, "log_level: error\n").unwrap();

    let output = run(
        home.path(),
        &["Hello", "--dry-run", "--config", config_path.to_str().unwrap()],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let log = log_contents(home.path());
    assert!(log.contains("Loaded config from"), "log: {}", log);
    assert!(!log.contains("Dry run"), "log: {}", log);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sends_event_and_prints_acknowledgment() {
    let home = TempDir::new().unwrap();
    let server = accepting_server().await;

    let mut cmd = command(home.path());
    cmd.args(["Pipeline failed", "pipeline.failed", "urgent", "-o", "json"])
        .args(["--actor", "ci", "--meta", "attempt=2"])
        .env("BREAKPOINT_URL", server.uri());
    let output = run_async(cmd).await;

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let ack: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(ack, json!({"accepted": 1, "event_ids": ["evt-1"]}));

    let event = sent_event(&server).await;
    assert_eq!(event["title"], "Pipeline failed");
    assert_eq!(event["event_type"], "pipeline.failed");
    assert_eq!(event["priority"], "urgent");
    assert_eq!(event["actor"], "ci");
    assert_eq!(event["metadata"], json!({"attempt": 2}));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_text_output() {
    let home = TempDir::new().unwrap();
    let server = accepting_server().await;

    let mut cmd = command(home.path());
    cmd.args(["Hello", "-o", "text", "--server", &server.uri()]);
    let output = run_async(cmd).await;

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("Accepted 1 event(s)"));
    assert!(out.contains("evt-1"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_token_from_env_sent_as_bearer() {
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/events"))
        .and(header("Authorization", "Bearer env-token"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"accepted": 1, "event_ids": ["a"]})))
        .expect(1)
        .mount(&server)
        .await;

    let mut cmd = command(home.path());
    cmd.args(["Hello", "-o", "json"])
        .env("BREAKPOINT_URL", server.uri())
        .env("BREAKPOINT_API_TOKEN", "env-token");
    let output = run_async(cmd).await;

    assert!(output.status.success(), "stderr: {}", stderr(&output));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unauthorized_exits_1_with_status() {
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let mut cmd = command(home.path());
    cmd.args(["Hello", "--server", &server.uri()]);
    let output = run_async(cmd).await;

    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("HTTP 401"), "stderr: {}", err);
    assert!(stdout(&output).is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_server_flag_overrides_env() {
    let home = TempDir::new().unwrap();
    let server = accepting_server().await;

    let mut cmd = command(home.path());
    cmd.args(["Hello", "-o", "json", "--server", &server.uri()])
        .env("BREAKPOINT_URL", format!("http://127.0.0.1:{}", unused_port()));
    let output = run_async(cmd).await;

    assert!(output.status.success(), "stderr: {}", stderr(&output));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_config_file_used_and_env_wins() {
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("Authorization", "Bearer from-env"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"accepted": 1, "event_ids": ["a"]})))
        .expect(1)
        .mount(&server)
        .await;

    let config_path = home.path().join("notify.yaml");
    fs::write(
        &config_path,
        format!("server:\n  url: {}\n  token: from-file\n  timeout_secs: 5\n", server.uri()),
    )
    .unwrap();

    let mut cmd = command(home.path());
    cmd.args(["Hello", "-o", "json", "--config"])
        .arg(&config_path)
        .env("BREAKPOINT_API_TOKEN", "from-env");
    let output = run_async(cmd).await;

    assert!(output.status.success(), "stderr: {}", stderr(&output));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_default_config_location() {
    let home = TempDir::new().unwrap();
    let server = accepting_server().await;

    let config_dir = home.path().join("config").join("breakpoint");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("notify.yaml"), format!("server:\n  url: {}\n", server.uri())).unwrap();

    let output = run_async({
        let mut cmd = command(home.path());
        cmd.args(["Hello", "-o", "json"]);
        cmd
    })
    .await;

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(sent_event(&server).await["title"], "Hello");
}

#[test]
fn test_missing_explicit_config_fails() {
    let home = TempDir::new().unwrap();
    let output = run(home.path(), &["Hello", "--config", "/nonexistent/notify.yaml"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Failed to load configuration"));
}
