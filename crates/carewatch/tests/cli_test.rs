//! Integration tests for the `carewatch` CLI binary.
//!
//! Argument parsing, help, completions, config handling, the alert history
//! commands against a mock gateway and `watch` against a loopback event
//! socket. No real gateway is needed.
#![allow(clippy::unwrap_used)]

use std::path::Path;
use std::process::Output;

use assert_cmd::cargo::cargo_bin_cmd;
use futures_util::{SinkExt, StreamExt};
use predicates::prelude::*;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

const NO_CONFIG: &str = "/tmp/carewatch-cli-test-nonexistent/config.toml";

/// Build a command for the `carewatch` binary with env isolation.
///
/// Clears every `CAREWATCH_*` variable the CLI reads and points the config
/// file at a nonexistent path so tests never touch a real configuration.
fn carewatch_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("carewatch");
    cmd.env("HOME", "/tmp/carewatch-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/carewatch-cli-test-nonexistent")
        .env("CAREWATCH_CONFIG", NO_CONFIG)
        .env_remove("CAREWATCH_PROFILE")
        .env_remove("CAREWATCH_URL")
        .env_remove("CAREWATCH_API")
        .env_remove("CAREWATCH_OUTPUT")
        .env_remove("CAREWATCH_INSECURE")
        .env_remove("CAREWATCH_TIMEOUT")
        .env_remove("CAREWATCH_USER")
        .env_remove("RUST_LOG");
    cmd
}

fn combined_output(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn write_config(dir: &Path) -> std::path::PathBuf {
    let file = dir.join("config.toml");
    std::fs::write(
        &file,
        r#"
default_profile = "home"

[profiles.home]
url = "ws://10.0.0.2:86/ws"

[profiles.clinic]
url = "wss://clinic.example/ws"
max_attempts = 8
"#,
    )
    .unwrap();
    file
}

/// Run a prepared command off the async runtime so the mock server keeps serving.
async fn run(mut cmd: assert_cmd::Command) -> Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = carewatch_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_commands() {
    carewatch_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("watch")
            .and(predicate::str::contains("alerts"))
            .and(predicate::str::contains("config"))
            .and(predicate::str::contains("completions")),
    );
}

#[test]
fn test_version_flag() {
    carewatch_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("carewatch"));
}

#[test]
fn test_completions_bash() {
    carewatch_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("carewatch"));
}

#[test]
fn test_invalid_subcommand() {
    carewatch_cmd().arg("frobnicate").assert().failure();
}

#[test]
fn test_invalid_output_format() {
    let output = carewatch_cmd()
        .args(["--output", "xml", "alerts", "list"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("possible values"),
        "Expected error about valid output formats:\n{text}"
    );
}

#[test]
fn test_alerts_subcommands_exist() {
    carewatch_cmd()
        .args(["alerts", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("list").and(predicate::str::contains("ack")));
}

#[test]
fn test_pending_conflicts_with_acknowledged() {
    let output = carewatch_cmd()
        .args(["alerts", "list", "--pending", "--acknowledged"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ── Missing / invalid configuration ─────────────────────────────────

#[test]
fn test_alerts_without_config_fails() {
    carewatch_cmd()
        .args(["alerts", "list"])
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("No gateway configured")
                .or(predicate::str::contains("config init")),
        );
}

#[test]
fn test_watch_rejects_http_url() {
    let output = carewatch_cmd()
        .args(["--url", "http://10.0.0.2/ws", "watch"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("ws://"), "Expected URL scheme hint:\n{text}");
}

#[test]
fn test_watch_rejects_zero_heartbeat() {
    let output = carewatch_cmd()
        .args(["--url", "ws://10.0.0.2/ws", "watch", "--heartbeat", "0s"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ── Config commands ─────────────────────────────────────────────────

#[test]
fn test_config_path_honors_override() {
    carewatch_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(NO_CONFIG));
}

#[test]
fn test_config_show_without_file_uses_defaults() {
    carewatch_cmd()
        .args(["config", "show", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"default_profile\": \"default\""));
}

#[test]
fn test_config_show_reads_profiles() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_config(dir.path());

    carewatch_cmd()
        .env("CAREWATCH_CONFIG", &file)
        .args(["config", "show", "-o", "json"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("ws://10.0.0.2:86/ws")
                .and(predicate::str::contains("wss://clinic.example/ws")),
        );
}

#[test]
fn test_config_profiles_marks_default() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_config(dir.path());

    carewatch_cmd()
        .env("CAREWATCH_CONFIG", &file)
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("home *").and(predicate::str::contains("clinic")));
}

#[test]
fn test_config_use_switches_default() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_config(dir.path());

    carewatch_cmd()
        .env("CAREWATCH_CONFIG", &file)
        .args(["config", "use", "clinic"])
        .assert()
        .success();

    let written = std::fs::read_to_string(&file).unwrap();
    assert!(written.contains("default_profile = \"clinic\""), "{written}");
}

#[test]
fn test_config_use_unknown_profile() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_config(dir.path());

    carewatch_cmd()
        .env("CAREWATCH_CONFIG", &file)
        .args(["config", "use", "office"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("office"));
}

// ── Alert history against a mock gateway ────────────────────────────

fn history_body() -> Value {
    json!([
        {
            "id": 12,
            "alert_type": "PANICO",
            "message": "Botão de pânico acionado",
            "timestamp": "2025-05-01 21:04:10",
            "acknowledged_by": "Ana",
            "acknowledged_at": "2025-05-01 21:05:00"
        },
        {
            "id": 11,
            "alert_type": "VAZAMENTO_GAS",
            "message": "Vazamento de gás",
            "timestamp": "2025-05-01 20:00:00",
            "acknowledged_by": null
        },
        {
            "id": 10,
            "alert_type": "QUEDA",
            "message": "Queda detectada",
            "timestamp": "2025-04-30 08:00:00",
            "acknowledged_by": ""
        }
    ])
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_alerts_list_pending_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/alerts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(history_body()))
        .mount(&server)
        .await;

    let mut cmd = carewatch_cmd();
    cmd.args(["--api", &server.uri(), "-o", "json", "alerts", "list", "--pending"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let listed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let ids: Vec<_> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(ids, ["11", "10"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_alerts_list_filters_by_day_and_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/alerts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(history_body()))
        .mount(&server)
        .await;

    let mut cmd = carewatch_cmd();
    cmd.args([
        "--api",
        &server.uri(),
        "-o",
        "plain",
        "alerts",
        "list",
        "--since",
        "2025-05-01",
        "--until",
        "2025-05-01",
        "--type",
        "panico",
    ]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "12");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_alerts_ack_requires_yes_when_not_interactive() {
    let server = MockServer::start().await;

    let mut cmd = carewatch_cmd();
    cmd.args(["--api", &server.uri(), "alerts", "ack", "11", "--user", "Ana"]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(2), "{}", combined_output(&output));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_alerts_ack_posts_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/acknowledge"))
        .and(body_string_contains("id=11"))
        .and(body_string_contains("user=Ana"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut cmd = carewatch_cmd();
    cmd.args(["--api", &server.uri(), "-y", "alerts", "ack", "11", "--user", "Ana"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(String::from_utf8_lossy(&output.stderr).contains("acknowledged"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_alerts_ack_unknown_id_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/acknowledge"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
        .mount(&server)
        .await;

    let mut cmd = carewatch_cmd();
    cmd.args(["--api", &server.uri(), "-y", "alerts", "ack", "99", "--user", "Ana"]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(4), "{}", combined_output(&output));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_alerts_ack_rejected_by_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/acknowledge"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "error", "message": "already acknowledged"})),
        )
        .mount(&server)
        .await;

    let mut cmd = carewatch_cmd();
    cmd.args(["--api", &server.uri(), "-y", "alerts", "ack", "12", "--user", "Ana"]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(6));
    assert!(combined_output(&output).contains("already acknowledged"));
}

// ── Watch ───────────────────────────────────────────────────────────

/// One-connection event socket: sends `frames`, then holds the link open
/// until the client hangs up.
async fn event_socket(frames: Vec<&'static str>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        for frame in frames {
            ws.send(Message::text(frame)).await.unwrap();
        }
        while let Some(Ok(_)) = ws.next().await {}
    });

    format!("ws://{addr}/ws")
}

fn json_lines(output: &Output) -> Vec<Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_watch_exits_with_connection_code_when_budget_is_spent() {
    // Grab a free port, then release it so nothing is listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut cmd = carewatch_cmd();
    cmd.args([
        "--url",
        &format!("ws://{addr}/ws"),
        "watch",
        "--max-attempts",
        "0",
        "--duration",
        "60s",
    ]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(7), "{}", combined_output(&output));
    assert!(combined_output(&output).contains(&addr.to_string()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_watch_duration_ends_cleanly() {
    let url = event_socket(vec![r#"{"type":"sensor","tipo":"Seguro"}"#]).await;

    let mut cmd = carewatch_cmd();
    cmd.args(["--url", &url, "-o", "json-compact", "watch", "--duration", "2s"]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(0), "{}", combined_output(&output));
    let lines = json_lines(&output);
    assert!(lines.iter().all(|l| l["event"] == "state"));
    assert!(
        lines.iter().any(|l| l["environment"] == "Seguro"),
        "sensor frame never shown: {lines:?}"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_watch_dismiss_acknowledges_once_per_state_change() {
    let url = event_socket(vec![r#"{"type":"botao","status":"Apertado"}"#]).await;

    let mut cmd = carewatch_cmd();
    cmd.args([
        "--url",
        &url,
        "-o",
        "json-compact",
        "watch",
        "--dismiss",
        "--duration",
        "2s",
    ]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(0), "{}", combined_output(&output));
    let events: Vec<Value> = json_lines(&output)
        .into_iter()
        .filter(|l| l["event"] != "state")
        .collect();

    // First sighting, then dismissed and raised again while the button is held.
    let first = &events[0];
    assert_eq!(first["event"], "alert");
    assert_eq!(first["kind"], "panic_button");
    assert_eq!(first["repeated"], false);

    let dismissals = events.iter().filter(|l| l["event"] == "dismissed").count();
    assert!(
        (1..=2).contains(&dismissals),
        "expected one dismissal per change, got {dismissals}: {events:?}"
    );
    for pair in events.windows(2) {
        if pair[0]["event"] == "dismissed" {
            assert_eq!(pair[1]["event"], "alert");
            assert_eq!(pair[1]["repeated"], true);
            assert_eq!(pair[1]["kind"], "panic_button");
        }
    }
    assert_eq!(events.last().unwrap()["event"], "alert");
    assert_eq!(events.len(), 1 + 2 * dismissals);
}
