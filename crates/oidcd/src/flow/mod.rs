// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The OIDC flow engine.
//!
//! One module per flow; each entry point takes the account record it
//! operates on and performs its network I/O on the shared HTTP client.
//! Flows never touch the registry: handlers copy the record out, run the
//! flow, and commit the result back under the registry mutex.

pub mod code;
pub mod device;
pub mod password;
pub mod refresh;
pub mod register;
pub mod revoke;

use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// The flows the agent can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Refresh,
    Password,
    Code,
    Device,
}

impl Flow {
    pub fn parse(s: &str) -> Result<Self, AgentError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "refresh" => Ok(Self::Refresh),
            "password" => Ok(Self::Password),
            "code" => Ok(Self::Code),
            "device" => Ok(Self::Device),
            other => Err(AgentError::UnknownFlow(other.to_owned())),
        }
    }

    /// OAuth grant type string for registration requests.
    pub fn grant_type(&self) -> &'static str {
        match self {
            Self::Refresh => "refresh_token",
            Self::Password => "password",
            Self::Code => "authorization_code",
            Self::Device => "urn:ietf:params:oauth:grant-type:device_code",
        }
    }
}

/// Parse a comma-joined flow list, e.g. `"refresh,password"`.
pub fn parse_flow_list(list: &str) -> Result<Vec<Flow>, AgentError> {
    let flows: Result<Vec<Flow>, AgentError> =
        list.split(',').filter(|s| !s.trim().is_empty()).map(Flow::parse).collect();
    let flows = flows?;
    if flows.is_empty() {
        return Err(AgentError::BadRequest("empty flow list".to_owned()));
    }
    Ok(flows)
}

/// Standard OAuth2 token-endpoint response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

/// OAuth 2.0 Device Authorization Response (RFC 8628).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceAuthResponse {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_uri_complete: Option<String>,
    #[serde(default = "default_device_expiry")]
    pub expires_in: u64,
    #[serde(default = "default_interval")]
    pub interval: u64,
}

fn default_interval() -> u64 {
    5
}

fn default_device_expiry() -> u64 {
    300
}

/// Structured error body from a provider endpoint.
#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Turn a non-success provider response body into an [`AgentError`].
/// Structured `{error, error_description}` bodies become `OidcError`;
/// anything else is a transport-level failure.
pub(crate) fn provider_error(status: reqwest::StatusCode, body: &str) -> AgentError {
    match serde_json::from_str::<ProviderErrorBody>(body) {
        Ok(e) => AgentError::OidcError { error: e.error, description: e.error_description },
        Err(_) => AgentError::NetworkError(format!("provider returned status {status}")),
    }
}

/// POST a form to a token-style endpoint and parse the token response.
pub(crate) async fn post_token_request(
    client: &reqwest::Client,
    endpoint: &str,
    params: &[(&str, &str)],
) -> Result<TokenResponse, AgentError> {
    let resp = client.post(endpoint).form(params).send().await?;
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(provider_error(status, &body));
    }
    let token: TokenResponse = resp
        .json()
        .await
        .map_err(|e| AgentError::NetworkError(format!("invalid token response: {e}")))?;
    Ok(token)
}

#[cfg(test)]
#[path = "flow_tests.rs"]
mod tests;
