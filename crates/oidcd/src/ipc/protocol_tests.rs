// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::AgentError;

#[test]
fn parses_every_request_kind() -> anyhow::Result<()> {
    let cases: Vec<(&str, fn(&Request) -> bool)> = vec![
        (r#"{"request":"gen","config":"{}","flow":"refresh,password"}"#, |r| {
            matches!(r, Request::Gen { .. })
        }),
        (r#"{"request":"add","config":"{}","timeout":"60"}"#, |r| {
            matches!(r, Request::Add { timeout: Some(60), .. })
        }),
        (r#"{"request":"remove","account_name":"s1"}"#, |r| {
            matches!(r, Request::Remove { .. })
        }),
        (r#"{"request":"delete","config":"{}"}"#, |r| matches!(r, Request::Delete { .. })),
        (r#"{"request":"remove_all"}"#, |r| matches!(r, Request::RemoveAll)),
        (r#"{"request":"access_token","account_name":"s1","min_valid_period":300}"#, |r| {
            matches!(r, Request::AccessToken { min_valid_period: Some(300), .. })
        }),
        (r#"{"request":"register","config":"{}","flow_list":"[\"refresh\"]"}"#, |r| {
            matches!(r, Request::Register { .. })
        }),
        (
            r#"{"request":"code_exchange","config":"{}","code":"c","redirect_uri":"u","state":"s","code_verifier":"v"}"#,
            |r| matches!(r, Request::CodeExchange { .. }),
        ),
        (r#"{"request":"state_lookup","state":"s"}"#, |r| {
            matches!(r, Request::StateLookup { .. })
        }),
        (r#"{"request":"device_lookup","config":"{}","device":"{}"}"#, |r| {
            matches!(r, Request::DeviceLookup { .. })
        }),
        (r#"{"request":"term_http","state":"s"}"#, |r| matches!(r, Request::TermHttp { .. })),
        (r#"{"request":"account_list"}"#, |r| matches!(r, Request::AccountList)),
        (r#"{"request":"lock","password":"pw"}"#, |r| matches!(r, Request::Lock { .. })),
        (r#"{"request":"unlock","password":"pw"}"#, |r| matches!(r, Request::Unlock { .. })),
    ];
    for (json, check) in cases {
        let req = Request::from_json(json.as_bytes())
            .unwrap_or_else(|e| panic!("{json} failed: {e}"));
        assert!(check(&req), "unexpected parse for {json}");
    }
    Ok(())
}

#[test]
fn numeric_fields_accept_numbers_and_strings() -> anyhow::Result<()> {
    let a = Request::from_json(br#"{"request":"add","config":"{}","timeout":60}"#)?;
    let b = Request::from_json(br#"{"request":"add","config":"{}","timeout":"60"}"#)?;
    for r in [a, b] {
        assert!(matches!(r, Request::Add { timeout: Some(60), .. }));
    }
    Ok(())
}

#[test]
fn confirm_flag_accepts_bool_and_string() -> anyhow::Result<()> {
    let a = Request::from_json(br#"{"request":"add","config":"{}","confirm":true}"#)?;
    let b = Request::from_json(br#"{"request":"add","config":"{}","confirm":"1"}"#)?;
    let c = Request::from_json(br#"{"request":"add","config":"{}"}"#)?;
    assert!(matches!(a, Request::Add { confirm: true, .. }));
    assert!(matches!(b, Request::Add { confirm: true, .. }));
    assert!(matches!(c, Request::Add { confirm: false, .. }));
    Ok(())
}

#[test]
fn malformed_requests_yield_badrequest() -> anyhow::Result<()> {
    for payload in [
        &b"not json"[..],
        br#"["array"]"#,
        br#"{"no":"request field"}"#,
        br#"{"request":"frobnicate"}"#,
        br#"{"request":"remove"}"#, // missing account_name
        br#"{"request":42}"#,
    ] {
        let err = Request::from_json(payload).expect_err("must fail");
        assert!(matches!(err, AgentError::BadRequest(_)), "payload {payload:?}");
    }
    Ok(())
}

#[test]
fn only_unlock_passes_while_locked() -> anyhow::Result<()> {
    let unlock = Request::from_json(br#"{"request":"unlock","password":"pw"}"#)?;
    assert!(unlock.allowed_while_locked());
    let lock = Request::from_json(br#"{"request":"lock","password":"pw"}"#)?;
    assert!(!lock.allowed_while_locked());
    let token = Request::from_json(br#"{"request":"access_token","account_name":"s1"}"#)?;
    assert!(!token.allowed_while_locked());
    Ok(())
}

#[test]
fn status_is_the_first_field_on_the_wire() -> anyhow::Result<()> {
    let resp = Response::success().info("Agent locked");
    let json = String::from_utf8(resp.to_json())?;
    assert!(json.starts_with(r#"{"status":"success""#), "got {json}");

    let resp = Response::from_error(&AgentError::AgentLocked);
    let json = String::from_utf8(resp.to_json())?;
    assert_eq!(json, r#"{"status":"failure","error":"agent locked"}"#);
    Ok(())
}

#[test]
fn provider_errors_carry_description() -> anyhow::Result<()> {
    let resp = Response::from_error(&AgentError::OidcError {
        error: "invalid_grant".to_owned(),
        description: Some("token revoked".to_owned()),
    });
    let json = String::from_utf8(resp.to_json())?;
    assert!(json.contains(r#""error":"invalid_grant""#));
    assert!(json.contains(r#""error_description":"token revoked""#));
    Ok(())
}

#[test]
fn empty_fields_are_omitted() -> anyhow::Result<()> {
    let json = String::from_utf8(Response::success().to_json())?;
    assert_eq!(json, r#"{"status":"success"}"#);
    Ok(())
}
