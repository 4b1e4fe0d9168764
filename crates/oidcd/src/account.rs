// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Account configuration (the wire form) and the in-memory account record.

use serde::{Deserialize, Serialize};

use crate::error::AgentError;
use crate::secret::SecretBuffer;

/// Scopes every usable account config carries after registration.
pub const SCOPE_OPENID: &str = "openid";
pub const SCOPE_OFFLINE_ACCESS: &str = "offline_access";

fn default_scope() -> String {
    format!("{SCOPE_OPENID} {SCOPE_OFFLINE_ACCESS}")
}

/// One account config as it crosses the IPC boundary.
///
/// Optional fields default to empty; secrets deserialize straight into
/// [`SecretBuffer`]s and never exist as plain `String`s in the record.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct AccountConfig {
    /// Local, user-chosen identifier. Unique within the registry.
    pub shortname: String,
    /// Canonical issuer URL; resolves to endpoints via discovery.
    pub issuer_url: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default, skip_serializing_if = "SecretBuffer::is_empty")]
    pub client_secret: SecretBuffer,
    /// Whitespace-separated scope list.
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub redirect_uris: Vec<String>,
    #[serde(default, skip_serializing_if = "SecretBuffer::is_empty")]
    pub refresh_token: SecretBuffer,
    /// Held only for the duration of a single password-flow attempt.
    #[serde(default, skip_serializing_if = "SecretBuffer::is_empty")]
    pub username: SecretBuffer,
    #[serde(default, skip_serializing_if = "SecretBuffer::is_empty")]
    pub password: SecretBuffer,
}

impl AccountConfig {
    /// Parse a config from its wire JSON, validating the required fields.
    pub fn from_json(json: &str) -> Result<Self, AgentError> {
        let config: AccountConfig = serde_json::from_str(json)
            .map_err(|e| AgentError::BadRequest(format!("could not parse account config: {e}")))?;
        if config.shortname.is_empty() {
            return Err(AgentError::BadRequest("account config needs a shortname".to_owned()));
        }
        if config.issuer_url.is_empty() {
            return Err(AgentError::BadRequest("account config needs an issuer_url".to_owned()));
        }
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, AgentError> {
        serde_json::to_string(self)
            .map_err(|e| AgentError::Internal(format!("could not serialize account config: {e}")))
    }

    /// Explicit deep copy; duplication of secret material stays visible.
    pub fn duplicate(&self) -> Self {
        Self {
            shortname: self.shortname.clone(),
            issuer_url: self.issuer_url.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.duplicate(),
            scope: self.scope.clone(),
            redirect_uris: self.redirect_uris.clone(),
            refresh_token: self.refresh_token.duplicate(),
            username: self.username.duplicate(),
            password: self.password.duplicate(),
        }
    }
}

/// A loaded account: config plus current token material and agent-side
/// bookkeeping. Secrets live in [`SecretBuffer`]s and are wiped when the
/// record is dropped, replaced, or the registry locks.
#[derive(Debug, Default)]
pub struct Account {
    pub config: AccountConfig,
    pub access_token: SecretBuffer,
    /// Absolute UNIX time the cached access token expires; 0 = unknown.
    pub access_token_expires_at: u64,
    /// Scopes granted to the cached access token.
    pub token_scope: String,
    /// Scratch for an in-flight authorization code flow.
    pub code_verifier: SecretBuffer,
    pub used_state: Option<String>,
    /// 0 = never expires; otherwise the reaper evicts past this time.
    pub death: u64,
    pub confirmation_required: bool,
}

impl Account {
    pub fn new(config: AccountConfig) -> Self {
        Self { config, ..Default::default() }
    }

    pub fn shortname(&self) -> &str {
        &self.config.shortname
    }

    /// Non-empty and not known to be revoked (revocation wipes it).
    pub fn refresh_token_is_valid(&self) -> bool {
        !self.config.refresh_token.is_empty()
    }

    /// Whether the cached access token satisfies a request for
    /// `min_valid_period` seconds of remaining lifetime and `scope`.
    pub fn access_token_is_valid(&self, min_valid_period: u64, scope: Option<&str>, now: u64) -> bool {
        if self.access_token.is_empty() || self.access_token_expires_at == 0 {
            return false;
        }
        if self.access_token_expires_at.saturating_sub(now) < min_valid_period {
            return false;
        }
        match scope {
            None => true,
            Some(requested) => scope_is_subset(requested, &self.token_scope),
        }
    }

    /// Store a token-endpoint response on the record.
    ///
    /// `cache_access_token` is false for narrow-scope tokens, which are
    /// handed to the caller without displacing the cached token. A rotated
    /// refresh token always replaces the stored one.
    pub fn store_tokens(
        &mut self,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_in: u64,
        granted_scope: Option<&str>,
        now: u64,
        cache_access_token: bool,
    ) {
        if cache_access_token {
            self.access_token.set(access_token.as_bytes().to_vec());
            self.access_token_expires_at = if expires_in > 0 { now + expires_in } else { 0 };
            self.token_scope = granted_scope.unwrap_or(&self.config.scope).to_owned();
        }
        if let Some(rt) = refresh_token {
            if !rt.is_empty() {
                self.config.refresh_token.set(rt.as_bytes().to_vec());
            }
        }
    }

    /// Wipe the one-shot password-flow credentials.
    pub fn wipe_credentials(&mut self) {
        self.config.username.clear();
        self.config.password.clear();
    }

    /// Clear the code-flow scratch. Every transition out of an in-flight
    /// code flow goes through here.
    pub fn clear_code_flow_scratch(&mut self) {
        self.code_verifier.clear();
        self.used_state = None;
    }

    /// Wipe every secret field.
    pub fn wipe(&mut self) {
        self.config.client_secret.clear();
        self.config.refresh_token.clear();
        self.config.username.clear();
        self.config.password.clear();
        self.access_token.clear();
        self.code_verifier.clear();
    }

    /// All secret fields, for lock/unlock sealing.
    pub fn secret_fields_mut(&mut self) -> [&mut SecretBuffer; 6] {
        [
            &mut self.config.client_secret,
            &mut self.config.refresh_token,
            &mut self.config.username,
            &mut self.config.password,
            &mut self.access_token,
            &mut self.code_verifier,
        ]
    }

    /// Explicit deep copy used by handlers that perform network I/O on a
    /// detached record and commit the result back afterwards.
    pub fn duplicate(&self) -> Self {
        Self {
            config: self.config.duplicate(),
            access_token: self.access_token.duplicate(),
            access_token_expires_at: self.access_token_expires_at,
            token_scope: self.token_scope.clone(),
            code_verifier: self.code_verifier.duplicate(),
            used_state: self.used_state.clone(),
            death: self.death,
            confirmation_required: self.confirmation_required,
        }
    }
}

/// `requested` ⊆ `granted`, both whitespace-separated scope lists.
pub fn scope_is_subset(requested: &str, granted: &str) -> bool {
    let granted: std::collections::HashSet<&str> = granted.split_whitespace().collect();
    requested.split_whitespace().all(|s| granted.contains(s))
}

#[cfg(test)]
#[path = "account_tests.rs"]
mod tests;
