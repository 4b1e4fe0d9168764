// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The refresh-token grant, with the cached-token short circuit.

use crate::account::Account;
use crate::error::AgentError;
use crate::flow::post_token_request;
use crate::util::epoch_secs;

/// Force a network round-trip regardless of the cached token.
pub const FORCE_NEW_TOKEN: u64 = u64::MAX;

/// An access token as handed back to the requesting client.
#[derive(Debug)]
pub struct IssuedToken {
    pub access_token: String,
    /// Absolute UNIX time; 0 when the provider gave no expiry.
    pub expires_at: u64,
}

/// Produce an access token valid for at least `min_valid_period` seconds.
///
/// Serves the cached token when it is still fresh and covers the
/// requested scope; otherwise redeems the refresh token at the token
/// endpoint and updates the record. A token minted for an explicitly
/// requested `scope` is returned without displacing the cached token.
pub async fn get_access_token(
    client: &reqwest::Client,
    token_endpoint: &str,
    account: &mut Account,
    min_valid_period: u64,
    scope: Option<&str>,
) -> Result<IssuedToken, AgentError> {
    let now = epoch_secs();
    if min_valid_period != FORCE_NEW_TOKEN
        && account.access_token_is_valid(min_valid_period, scope, now)
    {
        tracing::debug!(account = %account.shortname(), "serving cached access token");
        return Ok(IssuedToken {
            access_token: account.access_token.as_str().to_owned(),
            expires_at: account.access_token_expires_at,
        });
    }
    if !account.refresh_token_is_valid() {
        return Err(AgentError::NoRefreshToken);
    }

    let refresh_token = account.config.refresh_token.duplicate();
    let mut params = vec![
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token.as_str()),
        ("client_id", account.config.client_id.as_str()),
    ];
    let client_secret = account.config.client_secret.duplicate();
    if !client_secret.is_empty() {
        params.push(("client_secret", client_secret.as_str()));
    }
    if let Some(s) = scope {
        params.push(("scope", s));
    }

    let token = match post_token_request(client, token_endpoint, &params).await {
        Ok(token) => token,
        Err(e) => {
            // A revoked grant invalidates the stored refresh token.
            if matches!(&e, AgentError::OidcError { error, .. } if error == "invalid_grant") {
                account.config.refresh_token.clear();
            }
            return Err(e);
        }
    };

    tracing::debug!(
        account = %account.shortname(),
        expires_in = token.expires_in,
        rotated = token.refresh_token.is_some(),
        "access token refreshed"
    );
    let now = epoch_secs();
    let expires_at = if token.expires_in > 0 { now + token.expires_in } else { 0 };
    account.store_tokens(
        &token.access_token,
        token.refresh_token.as_deref(),
        token.expires_in,
        token.scope.as_deref(),
        now,
        scope.is_none(),
    );
    Ok(IssuedToken { access_token: token.access_token, expires_at })
}
