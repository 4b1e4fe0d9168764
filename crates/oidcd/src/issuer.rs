// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OIDC discovery: fetch and memoize issuer configurations.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::AgentError;

/// An issuer's discovery document (OIDC Discovery 1.0). Immutable after
/// fetch; cache entries are replaced wholesale, never partially mutated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssuerConfig {
    #[serde(default)]
    pub issuer: String,
    #[serde(default)]
    pub token_endpoint: String,
    #[serde(default)]
    pub authorization_endpoint: String,
    #[serde(default)]
    pub device_authorization_endpoint: String,
    #[serde(default)]
    pub registration_endpoint: String,
    #[serde(default)]
    pub revocation_endpoint: String,
    #[serde(default)]
    pub scopes_supported: Vec<String>,
    #[serde(default)]
    pub grant_types_supported: Vec<String>,
}

/// Per-issuer memoization of discovery documents.
pub struct IssuerCache {
    http: reqwest::Client,
    configs: Mutex<HashMap<String, Arc<IssuerConfig>>>,
}

impl IssuerCache {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http, configs: Mutex::new(HashMap::new()) }
    }

    /// Resolve the configuration for `issuer_url`, fetching the discovery
    /// document on first use.
    pub async fn get(&self, issuer_url: &str) -> Result<Arc<IssuerConfig>, AgentError> {
        if let Some(config) = self.configs.lock().await.get(issuer_url) {
            return Ok(Arc::clone(config));
        }

        let url = format!(
            "{}/.well-known/openid-configuration",
            issuer_url.trim_end_matches('/')
        );
        tracing::debug!(issuer = %issuer_url, "fetching issuer configuration");
        let resp = self.http.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(AgentError::NetworkError(format!(
                "issuer configuration fetch failed with status {}",
                resp.status()
            )));
        }
        let config: IssuerConfig = resp
            .json()
            .await
            .map_err(|e| AgentError::NetworkError(format!("invalid discovery document: {e}")))?;
        if config.token_endpoint.is_empty() {
            return Err(AgentError::NetworkError(
                "discovery document has no token endpoint".to_owned(),
            ));
        }

        let config = Arc::new(config);
        self.configs.lock().await.insert(issuer_url.to_owned(), Arc::clone(&config));
        Ok(config)
    }

    /// Drop a cached entry so the next `get` refetches.
    pub async fn invalidate(&self, issuer_url: &str) {
        self.configs.lock().await.remove(issuer_url);
    }
}

#[cfg(test)]
#[path = "issuer_tests.rs"]
mod tests;
