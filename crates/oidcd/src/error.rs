// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the agent.
//!
//! Every fallible operation returns `Result<T, AgentError>`; handlers
//! translate the error into exactly one wire response. The variants are a
//! closed set of kinds, not wrappers around foreign error types. Secret
//! material never appears in an error message.

use std::fmt;

/// Wire status for a response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Accepted,
    Failure,
    NotFound,
    BadRequest,
}

/// The closed error set of the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// Malformed JSON, missing field, or unknown request type.
    BadRequest(String),
    AccountNotLoaded,
    AccountAlreadyLoaded,
    AgentLocked,
    AgentNotLocked,
    BadPassword,
    /// Transport-layer failure reaching the provider or the frontend.
    NetworkError(String),
    /// Structured error returned by the provider. The body is already
    /// public, so it is forwarded verbatim.
    OidcError {
        error: String,
        description: Option<String>,
    },
    NoRefreshToken,
    InsufficientScope,
    UnknownFlow(String),
    NoRedirectUris,
    UserDenied,
    UserCancel,
    Timeout,
    /// Invariant violation. Always logged at error level before being
    /// reported as a generic internal failure.
    Internal(String),
}

impl AgentError {
    /// Wire status this error maps to.
    pub fn status(&self) -> Status {
        match self {
            Self::BadRequest(_) => Status::BadRequest,
            _ => Status::Failure,
        }
    }

    /// Human-readable wire phrase for the `error` field.
    pub fn message(&self) -> String {
        match self {
            Self::BadRequest(msg) => format!("Bad request: {msg}"),
            Self::AccountNotLoaded => "account not loaded".to_owned(),
            Self::AccountAlreadyLoaded => "account already loaded".to_owned(),
            Self::AgentLocked => "agent locked".to_owned(),
            Self::AgentNotLocked => "agent not locked".to_owned(),
            Self::BadPassword => "bad password".to_owned(),
            Self::NetworkError(msg) => format!("network error: {msg}"),
            Self::OidcError { error, .. } => error.clone(),
            Self::NoRefreshToken => "no refresh token".to_owned(),
            Self::InsufficientScope => "insufficient scope".to_owned(),
            Self::UnknownFlow(flow) => format!("unknown flow '{flow}'"),
            Self::NoRedirectUris => "no redirect uris configured".to_owned(),
            Self::UserDenied => "user denied".to_owned(),
            Self::UserCancel => "user cancelled".to_owned(),
            Self::Timeout => "timeout".to_owned(),
            Self::Internal(_) => "internal".to_owned(),
        }
    }

    /// Provider-supplied error description, when there is one.
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::OidcError { description, .. } => description.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OidcError {
                error,
                description: Some(d),
            } => write!(f, "{error}: {d}"),
            Self::Internal(msg) => write!(f, "internal: {msg}"),
            _ => f.write_str(&self.message()),
        }
    }
}

impl std::error::Error for AgentError {}

impl From<reqwest::Error> for AgentError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            // reqwest error strings carry URLs at most, never bodies.
            Self::NetworkError(e.without_url().to_string())
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
