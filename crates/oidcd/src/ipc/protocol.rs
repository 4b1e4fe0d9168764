// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request and response wire types for the agent socket.
//!
//! A request is one JSON object whose `request` field selects the
//! operation; a response is one JSON object whose first field is always
//! `status`.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AgentError, Status};
use crate::flow::DeviceAuthResponse;

/// Numeric fields arrive either as JSON numbers or as decimal strings
/// (clients historically send both).
fn num_or_str<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Num(u64),
        Str(String),
    }
    match Option::<NumOrStr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumOrStr::Num(n)) => Ok(Some(n)),
        Some(NumOrStr::Str(s)) => s
            .parse::<u64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("not a number: '{s}'"))),
    }
}

fn bool_or_str<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrStr {
        Bool(bool),
        Str(String),
    }
    match Option::<BoolOrStr>::deserialize(deserializer)? {
        None => Ok(false),
        Some(BoolOrStr::Bool(b)) => Ok(b),
        Some(BoolOrStr::Str(s)) => Ok(matches!(s.as_str(), "1" | "true" | "yes")),
    }
}

/// One client request.
#[derive(Debug, Deserialize)]
#[serde(tag = "request", rename_all = "snake_case")]
pub enum Request {
    Gen {
        config: String,
        flow: String,
    },
    Add {
        config: String,
        #[serde(default, deserialize_with = "num_or_str")]
        timeout: Option<u64>,
        #[serde(default, deserialize_with = "bool_or_str")]
        confirm: bool,
    },
    Remove {
        account_name: String,
    },
    Delete {
        config: String,
    },
    RemoveAll,
    AccessToken {
        account_name: String,
        #[serde(default, deserialize_with = "num_or_str")]
        min_valid_period: Option<u64>,
        #[serde(default)]
        scope: Option<String>,
        #[serde(default)]
        application_hint: Option<String>,
    },
    Register {
        config: String,
        flow_list: String,
        #[serde(default)]
        access_token: Option<String>,
    },
    CodeExchange {
        config: String,
        code: String,
        redirect_uri: String,
        state: String,
        code_verifier: String,
    },
    StateLookup {
        state: String,
    },
    DeviceLookup {
        config: String,
        device: String,
    },
    TermHttp {
        state: String,
    },
    AccountList,
    Lock {
        password: String,
    },
    Unlock {
        password: String,
    },
}

impl Request {
    /// Parse a request frame, producing the protocol's bad-request
    /// messages for the malformed cases.
    pub fn from_json(payload: &[u8]) -> Result<Self, AgentError> {
        let value: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|e| AgentError::BadRequest(format!("malformed JSON: {e}")))?;
        if !value.is_object() {
            return Err(AgentError::BadRequest("not a JSON object".to_owned()));
        }
        match value.get("request") {
            None => Err(AgentError::BadRequest("no request type".to_owned())),
            Some(serde_json::Value::String(_)) => serde_json::from_value(value)
                .map_err(|e| AgentError::BadRequest(e.to_string())),
            Some(_) => Err(AgentError::BadRequest("request type must be a string".to_owned())),
        }
    }

    /// True for the one request that must pass while the agent is locked.
    pub fn allowed_while_locked(&self) -> bool {
        matches!(self, Self::Unlock { .. })
    }
}

/// One response. `status` is declared first so it serializes first.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Response {
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_verifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oidc_device: Option<DeviceAuthResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accounts: Option<Vec<String>>,
}

impl Response {
    fn with_status(status: Status) -> Self {
        Self { status: Some(status), ..Default::default() }
    }

    pub fn success() -> Self {
        Self::with_status(Status::Success)
    }

    pub fn accepted() -> Self {
        Self::with_status(Status::Accepted)
    }

    pub fn notfound(info: impl Into<String>) -> Self {
        Self { info: Some(info.into()), ..Self::with_status(Status::NotFound) }
    }

    /// A failure whose message is not one of the taxonomy phrases.
    pub fn failure(error: impl Into<String>) -> Self {
        Self { error: Some(error.into()), ..Self::with_status(Status::Failure) }
    }

    pub fn from_error(e: &AgentError) -> Self {
        if let AgentError::Internal(msg) = e {
            tracing::error!(error = %msg, "internal error");
        }
        Self {
            error: Some(e.message()),
            error_description: e.description().map(str::to_owned),
            ..Self::with_status(e.status())
        }
    }

    pub fn info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }

    pub fn config(mut self, config: String) -> Self {
        self.config = Some(config);
        self
    }

    pub fn to_json(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_else(|_| br#"{"status":"failure","error":"internal"}"#.to_vec())
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
