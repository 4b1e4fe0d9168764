// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::account::{Account, AccountConfig};
use crate::error::AgentError;

fn code_account() -> Account {
    Account::new(AccountConfig {
        shortname: "s1".to_owned(),
        issuer_url: "https://issuer.example".to_owned(),
        client_id: "client-123".to_owned(),
        redirect_uris: vec!["http://localhost:4242/redirect".to_owned()],
        ..Default::default()
    })
}

#[test]
fn code_challenge_is_deterministic_s256() -> anyhow::Result<()> {
    let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    let c1 = compute_code_challenge(verifier);
    let c2 = compute_code_challenge(verifier);
    assert_eq!(c1, c2);
    // RFC 7636 appendix B vector.
    assert_eq!(c1, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    Ok(())
}

#[test]
fn init_records_state_and_verifier_on_account() -> anyhow::Result<()> {
    let mut account = code_account();
    let req = init(&mut account, "https://issuer.example/auth")?;

    assert_eq!(req.state.len(), 32); // 24 bytes, url-safe base64
    assert!(req.code_verifier.len() >= 43 && req.code_verifier.len() <= 128);
    assert_eq!(account.used_state.as_deref(), Some(req.state.as_str()));
    assert_eq!(account.code_verifier.as_str(), req.code_verifier);
    Ok(())
}

#[test]
fn init_without_redirect_uris_fails() -> anyhow::Result<()> {
    let mut account = code_account();
    account.config.redirect_uris.clear();
    assert!(matches!(
        init(&mut account, "https://issuer.example/auth"),
        Err(AgentError::NoRedirectUris)
    ));
    Ok(())
}

#[test]
fn auth_url_includes_pkce_params() -> anyhow::Result<()> {
    let url = build_auth_url(
        "https://issuer.example/auth",
        "client-123",
        "http://localhost:4242/redirect",
        "openid offline_access",
        "challenge-abc",
        "state-xyz",
    );
    assert!(url.starts_with("https://issuer.example/auth?response_type=code&"));
    assert!(url.contains("client_id=client-123"));
    assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A4242%2Fredirect"));
    assert!(url.contains("scope=openid+offline_access"));
    assert!(url.contains("code_challenge=challenge-abc"));
    assert!(url.contains("code_challenge_method=S256"));
    assert!(url.contains("state=state-xyz"));
    Ok(())
}

#[test]
fn states_are_unique() -> anyhow::Result<()> {
    let mut a = code_account();
    let mut b = code_account();
    let r1 = init(&mut a, "https://issuer.example/auth")?;
    let r2 = init(&mut b, "https://issuer.example/auth")?;
    assert_ne!(r1.state, r2.state);
    assert_ne!(r1.code_verifier, r2.code_verifier);
    Ok(())
}
