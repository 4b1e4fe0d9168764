// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RFC 8628 device authorization grant.

use std::time::Duration;

use crate::account::Account;
use crate::error::AgentError;
use crate::flow::{post_token_request, provider_error, DeviceAuthResponse};
use crate::util::epoch_secs;

/// Upper bound on a single `device_lookup` polling session, applied on
/// top of the provider's `expires_in`.
const MAX_POLL_SECS: u64 = 1800;

/// Request a device and user code pair from the issuer.
pub async fn init(
    client: &reqwest::Client,
    device_authorization_endpoint: &str,
    account: &Account,
) -> Result<DeviceAuthResponse, AgentError> {
    if device_authorization_endpoint.is_empty() {
        return Err(AgentError::OidcError {
            error: "issuer does not support the device flow".to_owned(),
            description: None,
        });
    }

    let mut params = vec![
        ("client_id", account.config.client_id.as_str()),
        ("scope", account.config.scope.as_str()),
    ];
    let client_secret = account.config.client_secret.duplicate();
    if !client_secret.is_empty() {
        params.push(("client_secret", client_secret.as_str()));
    }

    let resp = client.post(device_authorization_endpoint).form(&params).send().await?;
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(provider_error(status, &body));
    }
    let device: DeviceAuthResponse = resp
        .json()
        .await
        .map_err(|e| AgentError::NetworkError(format!("invalid device authorization response: {e}")))?;
    tracing::debug!(account = %account.shortname(), user_code = %device.user_code, "device flow initiated");
    Ok(device)
}

/// Poll the token endpoint until the user approves, denies, or the code
/// expires. `authorization_pending` keeps polling at the provider
/// interval; `slow_down` adds five seconds to it.
pub async fn lookup(
    client: &reqwest::Client,
    token_endpoint: &str,
    account: &mut Account,
    device: &DeviceAuthResponse,
) -> Result<(), AgentError> {
    let mut interval = Duration::from_secs(device.interval.max(1));
    let deadline =
        tokio::time::Instant::now() + Duration::from_secs(device.expires_in.min(MAX_POLL_SECS));

    loop {
        tokio::time::sleep(interval).await;
        if tokio::time::Instant::now() > deadline {
            return Err(AgentError::Timeout);
        }

        let mut params = vec![
            ("grant_type", "urn:ietf:params:oauth:grant-type:device_code"),
            ("device_code", device.device_code.as_str()),
            ("client_id", account.config.client_id.as_str()),
        ];
        let client_secret = account.config.client_secret.duplicate();
        if !client_secret.is_empty() {
            params.push(("client_secret", client_secret.as_str()));
        }

        match post_token_request(client, token_endpoint, &params).await {
            Ok(token) => {
                tracing::debug!(account = %account.shortname(), "device flow authorized");
                account.store_tokens(
                    &token.access_token,
                    token.refresh_token.as_deref(),
                    token.expires_in,
                    token.scope.as_deref(),
                    epoch_secs(),
                    true,
                );
                return Ok(());
            }
            Err(AgentError::OidcError { error, description }) => match error.as_str() {
                "authorization_pending" => continue,
                "slow_down" => {
                    interval += Duration::from_secs(5);
                    continue;
                }
                "access_denied" => return Err(AgentError::UserDenied),
                "expired_token" => return Err(AgentError::Timeout),
                _ => return Err(AgentError::OidcError { error, description }),
            },
            Err(e) => return Err(e),
        }
    }
}
