// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use tokio::io::BufReader;

use super::*;
use crate::error::AgentError;
use crate::ipc::framing;

/// Frontend stub: answers each incoming request with the next scripted
/// response body.
fn scripted_frontend(responses: Vec<serde_json::Value>) -> FrontendChannel {
    let (agent_side, frontend_side) = tokio::io::duplex(4096);
    let (agent_read, agent_write) = tokio::io::split(agent_side);
    let (frontend_read, mut frontend_write) = tokio::io::split(frontend_side);

    tokio::spawn(async move {
        let mut reader = BufReader::new(frontend_read);
        for response in responses {
            let Ok(Some(_request)) = framing::read_frame(&mut reader).await else {
                return;
            };
            let payload = serde_json::to_vec(&response).expect("encode response");
            if framing::write_frame(&mut frontend_write, &payload).await.is_err() {
                return;
            }
        }
    });

    FrontendChannel::from_pair(agent_read, agent_write)
}

#[tokio::test]
async fn autoload_returns_config() -> anyhow::Result<()> {
    let frontend = scripted_frontend(vec![serde_json::json!({
        "config": "{\"shortname\":\"s1\",\"issuer_url\":\"https://issuer.example\"}"
    })]);
    let config = frontend.request_autoload("s1", "myapp").await?;
    assert!(config.contains("s1"));
    Ok(())
}

#[tokio::test]
async fn autoload_cancel_maps_to_user_cancel() -> anyhow::Result<()> {
    let frontend = scripted_frontend(vec![serde_json::json!({"error_code": "user_cancel"})]);
    let err = frontend.request_autoload("s1", "").await.expect_err("must fail");
    assert_eq!(err, AgentError::UserCancel);
    Ok(())
}

#[tokio::test]
async fn confirm_accept_and_deny() -> anyhow::Result<()> {
    let frontend = scripted_frontend(vec![
        serde_json::json!({"accept": true}),
        serde_json::json!({"error_code": "user_denied"}),
    ]);
    frontend.request_confirm("s1", "myapp").await?;
    let err = frontend.request_confirm("s1", "myapp").await.expect_err("must fail");
    assert_eq!(err, AgentError::UserDenied);
    Ok(())
}

#[tokio::test]
async fn credentials_arrive_in_secret_buffers() -> anyhow::Result<()> {
    let frontend =
        scripted_frontend(vec![serde_json::json!({"username": "alice", "password": "pw"})]);
    let creds = frontend.request_credentials("s1").await?;
    assert_eq!(creds.username.as_str(), "alice");
    assert_eq!(creds.password.as_str(), "pw");
    Ok(())
}

#[tokio::test]
async fn disconnected_channel_declines_everything() -> anyhow::Result<()> {
    let frontend = FrontendChannel::disconnected();
    assert_eq!(frontend.request_autoload("s1", "").await.expect_err("fail"), AgentError::UserCancel);
    assert_eq!(frontend.request_confirm("s1", "").await.expect_err("fail"), AgentError::UserDenied);
    assert_eq!(frontend.request_credentials("s1").await.expect_err("fail"), AgentError::UserCancel);
    Ok(())
}

#[tokio::test]
async fn closed_pipe_is_a_network_error() -> anyhow::Result<()> {
    let (agent_side, frontend_side) = tokio::io::duplex(64);
    let (agent_read, agent_write) = tokio::io::split(agent_side);
    drop(frontend_side);
    let frontend = FrontendChannel::from_pair(agent_read, agent_write);
    let err = frontend.request_confirm("s1", "").await.expect_err("must fail");
    assert!(matches!(err, AgentError::NetworkError(_)));
    Ok(())
}
