// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dynamic client registration (RFC 7591, OIDC registration 1.0).

use crate::account::{Account, SCOPE_OFFLINE_ACCESS, SCOPE_OPENID};
use crate::account::scope_is_subset;
use crate::error::AgentError;
use crate::flow::{provider_error, Flow};

/// Result of a registration attempt that got a client back.
#[derive(Debug)]
pub struct RegistrationOutcome {
    /// The provider's registration response, verbatim.
    pub client: serde_json::Value,
    /// The password grant was requested but had to be dropped for the
    /// provider to accept the registration.
    pub password_grant_dropped: bool,
    /// The granted scope is missing `openid` or `offline_access`.
    pub insufficient_scope: bool,
}

/// Register a client for `account` at the issuer's registration endpoint.
///
/// If the provider rejects a flow list containing the password grant, the
/// registration is retried once without it.
pub async fn register(
    client: &reqwest::Client,
    registration_endpoint: &str,
    account: &Account,
    flows: &[Flow],
    access_token: Option<&str>,
) -> Result<RegistrationOutcome, AgentError> {
    if registration_endpoint.is_empty() {
        return Err(AgentError::OidcError {
            error: "issuer does not support dynamic registration".to_owned(),
            description: None,
        });
    }

    match attempt(client, registration_endpoint, account, flows, access_token).await {
        Ok(value) => Ok(outcome(value, false)),
        Err(first_error) => {
            if !flows.contains(&Flow::Password) {
                return Err(first_error);
            }
            let without_password: Vec<Flow> =
                flows.iter().copied().filter(|f| *f != Flow::Password).collect();
            tracing::debug!(
                account = %account.shortname(),
                "registration rejected, retrying without the password grant"
            );
            match attempt(client, registration_endpoint, account, &without_password, access_token)
                .await
            {
                Ok(value) => Ok(outcome(value, true)),
                // The retry did not help; the first rejection is the one
                // worth reporting.
                Err(_) => Err(first_error),
            }
        }
    }
}

async fn attempt(
    client: &reqwest::Client,
    registration_endpoint: &str,
    account: &Account,
    flows: &[Flow],
    access_token: Option<&str>,
) -> Result<serde_json::Value, AgentError> {
    let grant_types: Vec<&str> = flows.iter().map(Flow::grant_type).collect();
    let response_types: Vec<&str> =
        if flows.contains(&Flow::Code) { vec!["code"] } else { Vec::new() };

    let body = serde_json::json!({
        "application_type": "web",
        "client_name": format!("oidcd:{}", account.shortname()),
        "redirect_uris": account.config.redirect_uris,
        "scope": account.config.scope,
        "grant_types": grant_types,
        "response_types": response_types,
    });

    let mut req = client.post(registration_endpoint).json(&body);
    if let Some(token) = access_token {
        req = req.bearer_auth(token);
    }
    let resp = req.send().await?;
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(provider_error(status, &text));
    }
    let value: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| AgentError::NetworkError(format!("invalid registration response: {e}")))?;
    // Some providers return 200 with an error body.
    if value.get("error").is_some() {
        return Err(provider_error(status, &text));
    }
    Ok(value)
}

fn outcome(client: serde_json::Value, password_grant_dropped: bool) -> RegistrationOutcome {
    let granted_scope = client.get("scope").and_then(|s| s.as_str()).unwrap_or_default();
    let required = format!("{SCOPE_OPENID} {SCOPE_OFFLINE_ACCESS}");
    let insufficient_scope = !scope_is_subset(&required, granted_scope);
    RegistrationOutcome { client, password_grant_dropped, insufficient_scope }
}
