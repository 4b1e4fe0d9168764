// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RFC 7009 token revocation.

use crate::account::Account;
use crate::error::AgentError;
use crate::flow::provider_error;

/// Revoke the account's refresh token (falling back to the access token)
/// at the issuer's revocation endpoint. On success the revoked material
/// is wiped from the record.
pub async fn revoke(
    client: &reqwest::Client,
    revocation_endpoint: &str,
    account: &mut Account,
) -> Result<(), AgentError> {
    let (token, hint) = if account.refresh_token_is_valid() {
        (account.config.refresh_token.duplicate(), "refresh_token")
    } else if !account.access_token.is_empty() {
        (account.access_token.duplicate(), "access_token")
    } else {
        // Nothing to revoke.
        return Ok(());
    };

    if revocation_endpoint.is_empty() {
        return Err(AgentError::OidcError {
            error: "issuer does not support token revocation".to_owned(),
            description: None,
        });
    }

    let mut params = vec![
        ("token", token.as_str()),
        ("token_type_hint", hint),
        ("client_id", account.config.client_id.as_str()),
    ];
    let client_secret = account.config.client_secret.duplicate();
    if !client_secret.is_empty() {
        params.push(("client_secret", client_secret.as_str()));
    }

    let resp = client.post(revocation_endpoint).form(&params).send().await?;
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(provider_error(status, &body));
    }

    tracing::debug!(account = %account.shortname(), hint, "token revoked");
    account.config.refresh_token.clear();
    account.access_token.clear();
    account.access_token_expires_at = 0;
    Ok(())
}
