// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The channel to the out-of-process prompter (the client frontend).
//!
//! The agent initiates requests on this channel mid-handler to ask the
//! user for confirmation, a stored config (autoload), or credentials.
//! The channel is a framed duplex stream (the stdin/stdout of a prompter
//! process spawned from a shell template) guarded by a mutex so only one
//! agent-initiated request is outstanding at a time. Responses correlate
//! by request order.

use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncRead, AsyncWrite, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use crate::error::AgentError;
use crate::ipc::framing::{read_frame, write_frame};
use crate::secret::SecretBuffer;

/// Frontend request verbs.
pub const INT_REQUEST_AUTOLOAD: &str = "autoload";
pub const INT_REQUEST_CONFIRM: &str = "confirm";
pub const INT_REQUEST_CREDENTIALS: &str = "credentials";

/// How long the agent waits for the user to answer a prompt.
const PROMPT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Serialize)]
struct FrontendRequest<'a> {
    request: &'a str,
    account_name: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    application_hint: &'a str,
}

#[derive(Deserialize)]
struct FrontendResponse {
    #[serde(default)]
    config: Option<String>,
    #[serde(default)]
    accept: Option<bool>,
    #[serde(default)]
    username: Option<SecretBuffer>,
    #[serde(default)]
    password: Option<SecretBuffer>,
    #[serde(default)]
    error_code: Option<String>,
}

/// User credentials obtained through the frontend.
#[derive(Debug)]
pub struct Credentials {
    pub username: SecretBuffer,
    pub password: SecretBuffer,
}

struct Pipe {
    reader: Box<dyn AsyncBufRead + Send + Unpin>,
    writer: Box<dyn AsyncWrite + Send + Unpin>,
    // Keeps the prompter process from being reaped while in use.
    _child: Option<Child>,
}

/// Mutex-guarded channel to the prompter. With no prompter attached,
/// every request resolves to the user-declined outcome.
pub struct FrontendChannel {
    pipe: Mutex<Option<Pipe>>,
}

impl FrontendChannel {
    /// A channel with no prompter attached.
    pub fn disconnected() -> Self {
        Self { pipe: Mutex::new(None) }
    }

    /// Spawn the prompter from a shell template and attach its
    /// stdin/stdout as the channel.
    pub fn spawn(template: &str) -> Result<Self, AgentError> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(template)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| AgentError::Internal(format!("could not spawn prompter: {e}")))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AgentError::Internal("prompter has no stdin".to_owned()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AgentError::Internal("prompter has no stdout".to_owned()))?;
        tracing::info!("prompter spawned");
        Ok(Self {
            pipe: Mutex::new(Some(Pipe {
                reader: Box::new(BufReader::new(stdout)),
                writer: Box::new(stdin),
                _child: Some(child),
            })),
        })
    }

    /// Attach an arbitrary duplex pair (used by tests).
    pub fn from_pair(
        reader: impl AsyncRead + Send + Unpin + 'static,
        writer: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        Self {
            pipe: Mutex::new(Some(Pipe {
                reader: Box::new(BufReader::new(reader)),
                writer: Box::new(writer),
                _child: None,
            })),
        }
    }

    /// Ask the frontend to supply a stored config for `account_name`.
    pub async fn request_autoload(
        &self,
        account_name: &str,
        application_hint: &str,
    ) -> Result<String, AgentError> {
        let resp = self
            .roundtrip(FrontendRequest {
                request: INT_REQUEST_AUTOLOAD,
                account_name,
                application_hint,
            })
            .await?;
        match (resp.config, resp.error_code) {
            (Some(config), _) => Ok(config),
            (None, code) => Err(declined(code, AgentError::UserCancel)),
        }
    }

    /// Ask the user to confirm handing out a token for `account_name`.
    pub async fn request_confirm(
        &self,
        account_name: &str,
        application_hint: &str,
    ) -> Result<(), AgentError> {
        let resp = self
            .roundtrip(FrontendRequest {
                request: INT_REQUEST_CONFIRM,
                account_name,
                application_hint,
            })
            .await?;
        match (resp.accept, resp.error_code) {
            (Some(true), _) => Ok(()),
            (_, code) => Err(declined(code, AgentError::UserDenied)),
        }
    }

    /// Ask the user for username and password.
    pub async fn request_credentials(&self, account_name: &str) -> Result<Credentials, AgentError> {
        let resp = self
            .roundtrip(FrontendRequest {
                request: INT_REQUEST_CREDENTIALS,
                account_name,
                application_hint: "",
            })
            .await?;
        match (resp.username, resp.password, resp.error_code) {
            (Some(username), Some(password), _) => Ok(Credentials { username, password }),
            (_, _, code) => Err(declined(code, AgentError::UserCancel)),
        }
    }

    async fn roundtrip(&self, request: FrontendRequest<'_>) -> Result<FrontendResponse, AgentError> {
        let mut guard = self.pipe.lock().await;
        let Some(pipe) = guard.as_mut() else {
            // No prompter: every caller sees its user-declined outcome.
            return Ok(FrontendResponse {
                config: None,
                accept: None,
                username: None,
                password: None,
                error_code: None,
            });
        };

        let payload = serde_json::to_vec(&request)
            .map_err(|e| AgentError::Internal(format!("frontend request encode failed: {e}")))?;
        write_frame(&mut pipe.writer, &payload).await?;

        let frame = tokio::time::timeout(PROMPT_TIMEOUT, read_frame(&mut pipe.reader))
            .await
            .map_err(|_| AgentError::Timeout)??
            .ok_or_else(|| AgentError::NetworkError("frontend closed the pipe".to_owned()))?;
        serde_json::from_slice(&frame)
            .map_err(|e| AgentError::NetworkError(format!("invalid frontend response: {e}")))
    }
}

fn declined(error_code: Option<String>, default: AgentError) -> AgentError {
    match error_code.as_deref() {
        Some("user_cancel") => AgentError::UserCancel,
        Some("user_denied") => AgentError::UserDenied,
        Some("timeout") => AgentError::Timeout,
        Some(other) => AgentError::NetworkError(format!("frontend error: {other}")),
        None => default,
    }
}

#[cfg(test)]
#[path = "frontend_tests.rs"]
mod tests;
