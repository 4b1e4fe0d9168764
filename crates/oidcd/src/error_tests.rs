// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn bad_request_maps_to_badrequest_status() -> anyhow::Result<()> {
    let e = AgentError::BadRequest("no request type".to_owned());
    assert_eq!(e.status(), Status::BadRequest);
    assert_eq!(e.message(), "Bad request: no request type");
    Ok(())
}

#[test]
fn other_kinds_map_to_failure_status() -> anyhow::Result<()> {
    for e in [
        AgentError::AccountNotLoaded,
        AgentError::AgentLocked,
        AgentError::BadPassword,
        AgentError::NoRefreshToken,
        AgentError::Timeout,
    ] {
        assert_eq!(e.status(), Status::Failure);
    }
    Ok(())
}

#[test]
fn wire_phrases_match_protocol() -> anyhow::Result<()> {
    assert_eq!(AgentError::AccountNotLoaded.message(), "account not loaded");
    assert_eq!(AgentError::AgentLocked.message(), "agent locked");
    assert_eq!(AgentError::BadPassword.message(), "bad password");
    Ok(())
}

#[test]
fn provider_error_forwards_code_and_description() -> anyhow::Result<()> {
    let e = AgentError::OidcError {
        error: "invalid_grant".to_owned(),
        description: Some("refresh token revoked".to_owned()),
    };
    assert_eq!(e.message(), "invalid_grant");
    assert_eq!(e.description(), Some("refresh token revoked"));
    assert_eq!(e.to_string(), "invalid_grant: refresh token revoked");
    Ok(())
}

#[test]
fn internal_message_is_not_exposed_on_the_wire() -> anyhow::Result<()> {
    let e = AgentError::Internal("mutex poisoned near token cache".to_owned());
    assert_eq!(e.message(), "internal");
    Ok(())
}

#[test]
fn status_serializes_lowercase() -> anyhow::Result<()> {
    assert_eq!(serde_json::to_string(&Status::Success)?, "\"success\"");
    assert_eq!(serde_json::to_string(&Status::BadRequest)?, "\"badrequest\"");
    assert_eq!(serde_json::to_string(&Status::NotFound)?, "\"notfound\"");
    Ok(())
}
