// SPDX-FileCopyrightText: 2026 Hubrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runs the `hubrelay` binary against a mock HipChat server.
//!
//! Each invocation gets an empty environment and an empty working directory
//! so no local config file or stray variable leaks in.

use std::process::Output;

use tokio::process::Command;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn hubrelay(args: &[&str], env: &[(&str, &str)]) -> Output {
    let workdir = tempfile::tempdir().unwrap();
    Command::new(env!("CARGO_BIN_EXE_hubrelay"))
        .args(args)
        .env_clear()
        .envs(env.iter().copied())
        .env("HOME", workdir.path())
        .current_dir(workdir.path())
        .output()
        .await
        .unwrap()
}

async fn mount_session(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/oauth/token/api-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "session-token",
            "owner": {"id": 77, "name": "Relay Bot"}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn check_prints_owner() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    let endpoint = format!("{}/", server.uri());

    let output = hubrelay(
        &["check"],
        &[
            ("HUBRELAY_HIPCHAT_API_TOKEN", "api-token"),
            ("HUBRELAY_HIPCHAT_ENDPOINT", &endpoint),
            ("HUBRELAY_HIPCHAT_ROOMS", "ops,dev"),
        ],
    )
    .await;

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("Relay Bot (id 77)"));
    assert!(stdout.contains("ops, dev"));
}

#[tokio::test]
async fn legacy_variables_are_honoured() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    let endpoint = format!("{}/", server.uri());

    let output = hubrelay(
        &["check"],
        &[
            ("HUBOT_HIPCHAT_API_TOKEN", "api-token"),
            ("HUBOT_HIPCHAT_API_ENDPOINT", &endpoint),
        ],
    )
    .await;

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("rooms:    none configured"));
}

#[tokio::test]
async fn send_posts_message() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    Mock::given(method("POST"))
        .and(path("/room/ops/message"))
        .and(body_json(serde_json::json!({"message": "hello from the cli"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    let endpoint = format!("{}/", server.uri());

    let output = hubrelay(
        &["send", "--room", "ops", "hello", "from", "the", "cli"],
        &[
            ("HUBRELAY_HIPCHAT_API_TOKEN", "api-token"),
            ("HUBRELAY_HIPCHAT_ENDPOINT", &endpoint),
        ],
    )
    .await;

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("sent 1 chunk(s) to ops"));
}

#[tokio::test]
async fn rejected_session_exits_non_zero() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oauth/token/api-token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let endpoint = format!("{}/", server.uri());

    let output = hubrelay(
        &["serve"],
        &[
            ("HUBRELAY_HIPCHAT_API_TOKEN", "api-token"),
            ("HUBRELAY_HIPCHAT_ENDPOINT", &endpoint),
            ("HUBRELAY_HIPCHAT_ROOMS", "ops"),
        ],
    )
    .await;

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("session error"));
}

#[tokio::test]
async fn misspelled_key_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("relay.toml");
    std::fs::write(&file, "[hipchat]\nromms = \"ops\"\n").unwrap();

    let output = hubrelay(&["check", "--config", file.to_str().unwrap()], &[]).await;

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("romms"));
    assert!(stderr.contains("rooms"));
}
