//! Integration tests for the chatbocs binary.
//! Uses assert_cmd to run the binary, a real temp config, and in-process
//! WebSocket / HTTP servers. No mocks.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write as _;
use std::net::TcpListener as StdTcpListener;

/// Pick a free port by binding to :0 and extracting the assigned port.
fn free_port() -> u16 {
    let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Write a minimal YAML config pointing both endpoints at `port`.
fn write_config(dir: &tempfile::TempDir, port: u16) -> std::path::PathBuf {
    let path = dir.path().join("config.yaml");
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(
        f,
        "server:\n  socket_url: ws://127.0.0.1:{port}\n  http_base: http://127.0.0.1:{port}",
        port = port
    )
    .unwrap();
    path
}

/// Spawn a minimal WebSocket server that accepts one connection, waits for
/// one `ask` frame, and replies with a `response` frame.
fn spawn_socket_server(port: u16, reply: &'static str) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
                .await
                .unwrap();

            // Accept one connection (the binary under test).
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            let (mut write, mut read) = ws.split();

            // Wait for the ask frame.
            use futures_util::StreamExt;
            let _ = read.next().await;

            use futures_util::SinkExt;
            use tokio_tungstenite::tungstenite::Message;
            write.send(Message::Text(reply.into())).await.unwrap();

            // Small delay so the client can read before we drop.
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        });
    })
}

/// Like `spawn_socket_server`, but after replying keeps reading and reports
/// whether the client ended the connection with a close frame.
fn spawn_socket_server_expecting_close(
    port: u16,
    reply: &'static str,
) -> std::thread::JoinHandle<bool> {
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            use futures_util::{SinkExt, StreamExt};
            use tokio_tungstenite::tungstenite::Message;

            let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
                .await
                .unwrap();
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();

            let _ = ws.next().await;
            ws.send(Message::Text(reply.into())).await.unwrap();

            let next = tokio::time::timeout(std::time::Duration::from_secs(5), ws.next()).await;
            matches!(next, Ok(Some(Ok(Message::Close(_)))))
        })
    })
}

/// Spawn an HTTP backend whose `/ask` answers with `status` and `body`.
fn spawn_http_server(
    port: u16,
    status: u16,
    body: &'static str,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async move {
            use axum::http::{header, StatusCode};
            let app = axum::Router::new().route(
                "/ask",
                axum::routing::post(move || async move {
                    (
                        StatusCode::from_u16(status).unwrap(),
                        [(header::CONTENT_TYPE, "application/json")],
                        body,
                    )
                }),
            );
            let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
                .await
                .unwrap();
            let serve = async move { axum::serve(listener, app).await };
            let _ = tokio::time::timeout(std::time::Duration::from_secs(10), serve).await;
        });
    })
}

const ANSWER: &str = r#"{"event":"response","data":{"response":"Test answer."}}"#;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn one_shot_prints_answer() {
    let port = free_port();
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(&dir, port);

    let _server = spawn_socket_server(port, ANSWER);
    std::thread::sleep(std::time::Duration::from_millis(100));

    let mut cmd = Command::from(cargo_bin_cmd!("chatbocs"));
    cmd.arg("--config")
        .arg(&config_path)
        .arg("What is the answer?");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("bot> Test answer."));
}

#[test]
fn interactive_session_prints_welcome_and_answer() {
    let port = free_port();
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(&dir, port);

    let _server = spawn_socket_server(port, ANSWER);
    std::thread::sleep(std::time::Duration::from_millis(100));

    // Blank lines are ignored; the real question waits for its answer after EOF.
    let mut cmd = Command::from(cargo_bin_cmd!("chatbocs"));
    cmd.arg("--config")
        .arg(&config_path)
        .write_stdin("   \nWhat is the answer?\n");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("bot> Bienvenue sur Chat-BOCS"))
        .stdout(predicate::str::contains("bot> Test answer."));
}

#[test]
fn config_env_var_is_used() {
    let port = free_port();
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(&dir, port);

    let _server = spawn_socket_server(port, ANSWER);
    std::thread::sleep(std::time::Duration::from_millis(100));

    let mut cmd = Command::from(cargo_bin_cmd!("chatbocs"));
    cmd.env("CHATBOCS_CONFIG", &config_path)
        .arg("What is the answer?");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Test answer."));
}

#[test]
fn url_flag_overrides_config() {
    let port = free_port();
    let dir = tempfile::tempdir().unwrap();
    // Config points at a dead port; --url points at the live server.
    let config_path = write_config(&dir, free_port());

    let _server = spawn_socket_server(port, ANSWER);
    std::thread::sleep(std::time::Duration::from_millis(100));

    let mut cmd = Command::from(cargo_bin_cmd!("chatbocs"));
    cmd.arg("--config")
        .arg(&config_path)
        .arg("--url")
        .arg(format!("ws://127.0.0.1:{}", port))
        .arg("What is the answer?");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Test answer."));
}

#[test]
fn http_one_shot_prints_answer() {
    let port = free_port();
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(&dir, port);

    let _server = spawn_http_server(port, 200, r#"{"response":"HTTP answer."}"#);
    std::thread::sleep(std::time::Duration::from_millis(100));

    let mut cmd = Command::from(cargo_bin_cmd!("chatbocs"));
    cmd.arg("--config")
        .arg(&config_path)
        .arg("--http")
        .arg("What is the answer?");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("bot> HTTP answer."));
}

#[test]
fn http_backend_error_fails() {
    let port = free_port();
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(&dir, port);

    let _server = spawn_http_server(port, 500, r#"{"error":"agent crashed"}"#);
    std::thread::sleep(std::time::Duration::from_millis(100));

    let mut cmd = Command::from(cargo_bin_cmd!("chatbocs"));
    cmd.arg("--config")
        .arg(&config_path)
        .arg("--http")
        .arg("What is the answer?");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("agent crashed"));
}

#[test]
fn server_down_shows_error() {
    // Point the config at a port where nothing is listening.
    let port = free_port();
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(&dir, port);

    let mut cmd = Command::from(cargo_bin_cmd!("chatbocs"));
    cmd.arg("--config").arg(&config_path).write_stdin("hello\n");

    cmd.assert()
        .failure()
        .stderr(predicate::str::is_match("(?i)(connect|error|refused)").unwrap());
}

#[test]
fn missing_explicit_config_fails() {
    let dir = tempfile::tempdir().unwrap();

    let mut cmd = Command::from(cargo_bin_cmd!("chatbocs"));
    cmd.arg("--config")
        .arg(dir.path().join("nope.yaml"))
        .arg("hello");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}

#[test]
fn one_shot_closes_socket_cleanly() {
    let port = free_port();
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(&dir, port);

    let server = spawn_socket_server_expecting_close(port, ANSWER);
    std::thread::sleep(std::time::Duration::from_millis(100));

    let mut cmd = Command::from(cargo_bin_cmd!("chatbocs"));
    cmd.arg("--config")
        .arg(&config_path)
        .arg("What is the answer?");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Test answer."));

    assert!(
        server.join().unwrap(),
        "server should receive a close frame before the client exits"
    );
}

#[test]
fn interactive_session_closes_socket_cleanly() {
    let port = free_port();
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(&dir, port);

    let server = spawn_socket_server_expecting_close(port, ANSWER);
    std::thread::sleep(std::time::Duration::from_millis(100));

    let mut cmd = Command::from(cargo_bin_cmd!("chatbocs"));
    cmd.arg("--config")
        .arg(&config_path)
        .write_stdin("What is the answer?\n");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Test answer."));

    assert!(
        server.join().unwrap(),
        "server should receive a close frame before the client exits"
    );
}
