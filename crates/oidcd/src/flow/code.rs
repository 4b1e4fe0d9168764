// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authorization code flow with PKCE (RFC 7636, always S256).

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::account::Account;
use crate::crypto::random_base64url;
use crate::error::AgentError;
use crate::flow::post_token_request;
use crate::secret::SecretBuffer;
use crate::util::{epoch_secs, urlencode};

/// `state` entropy in bytes: 24 bytes -> 32 URL-safe characters.
const STATE_LEN: usize = 24;

/// Verifier entropy in bytes: 64 bytes -> 86 characters, within the
/// 43..=128 range RFC 7636 allows.
const VERIFIER_LEN: usize = 64;

/// The material handed back to the caller when a code flow starts.
pub struct AuthCodeRequest {
    pub authorization_url: String,
    pub state: String,
    pub code_verifier: String,
}

/// Compute `code_challenge = BASE64URL(SHA256(verifier))`.
pub fn compute_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Start a code flow: mint `state` and verifier, record them on the
/// account as in-flight scratch, and build the authorization URL for the
/// first configured redirect URI.
pub fn init(account: &mut Account, authorization_endpoint: &str) -> Result<AuthCodeRequest, AgentError> {
    let Some(redirect_uri) = account.config.redirect_uris.first() else {
        return Err(AgentError::NoRedirectUris);
    };

    let state = random_base64url(STATE_LEN);
    let code_verifier = random_base64url(VERIFIER_LEN);
    let code_challenge = compute_code_challenge(&code_verifier);

    let authorization_url = build_auth_url(
        authorization_endpoint,
        &account.config.client_id,
        redirect_uri,
        &account.config.scope,
        &code_challenge,
        &state,
    );

    account.used_state = Some(state.clone());
    account.code_verifier = SecretBuffer::from(code_verifier.as_str());

    Ok(AuthCodeRequest { authorization_url, state, code_verifier })
}

/// Build the full authorization URL with PKCE parameters.
pub fn build_auth_url(
    authorization_endpoint: &str,
    client_id: &str,
    redirect_uri: &str,
    scope: &str,
    code_challenge: &str,
    state: &str,
) -> String {
    format!(
        "{authorization_endpoint}?response_type=code\
         &client_id={client_id}\
         &redirect_uri={redirect_uri}\
         &scope={scope}\
         &code_challenge={code_challenge}\
         &code_challenge_method=S256\
         &state={state}",
        client_id = urlencode(client_id),
        redirect_uri = urlencode(redirect_uri),
        scope = urlencode(scope),
        code_challenge = urlencode(code_challenge),
        state = urlencode(state),
    )
}

/// Redeem an authorization code at the token endpoint.
pub async fn exchange(
    client: &reqwest::Client,
    token_endpoint: &str,
    account: &mut Account,
    code: &str,
    redirect_uri: &str,
    code_verifier: &str,
) -> Result<(), AgentError> {
    let mut params = vec![
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", redirect_uri),
        ("code_verifier", code_verifier),
        ("client_id", account.config.client_id.as_str()),
    ];
    let client_secret = account.config.client_secret.duplicate();
    if !client_secret.is_empty() {
        params.push(("client_secret", client_secret.as_str()));
    }

    let token = post_token_request(client, token_endpoint, &params).await?;
    tracing::debug!(account = %account.shortname(), "authorization code exchanged");
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

#[cfg(test)]
#[path = "code_tests.rs"]
mod tests;
