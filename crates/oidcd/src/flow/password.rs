// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The resource-owner password grant.
//!
//! Credentials are requested from the frontend when the record does not
//! already carry them, used for exactly one token request, and wiped from
//! the record afterwards in every outcome.

use crate::account::Account;
use crate::error::AgentError;
use crate::flow::post_token_request;
use crate::frontend::FrontendChannel;
use crate::util::epoch_secs;

pub async fn get_tokens(
    client: &reqwest::Client,
    token_endpoint: &str,
    account: &mut Account,
    frontend: &FrontendChannel,
) -> Result<(), AgentError> {
    if account.config.username.is_empty() || account.config.password.is_empty() {
        let creds = frontend.request_credentials(account.shortname()).await?;
        account.config.username = creds.username;
        account.config.password = creds.password;
    }

    let result = attempt(client, token_endpoint, account).await;
    account.wipe_credentials();
    result
}

async fn attempt(
    client: &reqwest::Client,
    token_endpoint: &str,
    account: &mut Account,
) -> Result<(), AgentError> {
    let username = account.config.username.duplicate();
    let password = account.config.password.duplicate();
    let mut params = vec![
        ("grant_type", "password"),
        ("username", username.as_str()),
        ("password", password.as_str()),
        ("client_id", account.config.client_id.as_str()),
        ("scope", account.config.scope.as_str()),
    ];
    let client_secret = account.config.client_secret.duplicate();
    if !client_secret.is_empty() {
        params.push(("client_secret", client_secret.as_str()));
    }

    let token = post_token_request(client, token_endpoint, &params).await?;
    tracing::debug!(account = %account.shortname(), "password grant succeeded");
    account.store_tokens(
        &token.access_token,
        token.refresh_token.as_deref(),
        token.expires_in,
        token.scope.as_deref(),
        epoch_secs(),
        true,
    );
    Ok(())
}
