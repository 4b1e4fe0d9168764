// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::account::{Account, AccountConfig};
use crate::error::AgentError;
use crate::secret::SecretBuffer;

fn account(shortname: &str) -> Account {
    Account::new(AccountConfig {
        shortname: shortname.to_owned(),
        issuer_url: "https://issuer.example".to_owned(),
        client_id: "client".to_owned(),
        refresh_token: SecretBuffer::from("R"),
        ..Default::default()
    })
}

#[test]
fn insert_is_unique_by_shortname() -> anyhow::Result<()> {
    let mut reg = AccountRegistry::new();
    reg.insert(account("s1"));
    reg.insert(account("s2"));
    assert_eq!(reg.len(), 2);

    // Re-inserting replaces, never duplicates.
    let mut replacement = account("s1");
    replacement.config.refresh_token = SecretBuffer::from("R2");
    reg.insert(replacement);
    assert_eq!(reg.len(), 2);
    let found = reg.find("s1").expect("s1 loaded");
    assert_eq!(found.config.refresh_token.as_str(), "R2");
    Ok(())
}

#[test]
fn find_by_state_matches_in_flight_flows() -> anyhow::Result<()> {
    let mut reg = AccountRegistry::new();
    let mut a = account("s1");
    a.used_state = Some("state-xyz".to_owned());
    reg.insert(a);
    reg.insert(account("s2"));

    assert_eq!(reg.find_by_state("state-xyz").map(Account::shortname), Some("s1"));
    assert!(reg.find_by_state("other").is_none());
    Ok(())
}

#[test]
fn remove_and_remove_all() -> anyhow::Result<()> {
    let mut reg = AccountRegistry::new();
    reg.insert(account("s1"));
    reg.insert(account("s2"));

    assert!(reg.remove("s1"));
    assert!(!reg.remove("s1"));
    assert_eq!(reg.len(), 1);

    reg.remove_all();
    assert!(reg.is_empty());
    Ok(())
}

#[test]
fn reap_evicts_only_past_death() -> anyhow::Result<()> {
    let mut reg = AccountRegistry::new();
    let mut dying = account("dying");
    dying.death = 100;
    let mut later = account("later");
    later.death = 200;
    let immortal = account("immortal"); // death == 0
    reg.insert(dying);
    reg.insert(later);
    reg.insert(immortal);

    assert_eq!(reg.reap(100), 1);
    assert!(reg.find("dying").is_none());
    assert!(reg.find("later").is_some());
    assert!(reg.find("immortal").is_some());

    assert_eq!(reg.reap(1000), 1);
    assert!(reg.find("immortal").is_some());
    Ok(())
}

#[test]
fn shortnames_are_sorted() -> anyhow::Result<()> {
    let mut reg = AccountRegistry::new();
    reg.insert(account("zeta"));
    reg.insert(account("alpha"));
    assert_eq!(reg.shortnames(), vec!["alpha".to_owned(), "zeta".to_owned()]);
    Ok(())
}

#[test]
fn lock_seals_secrets_and_unlock_restores_them() -> anyhow::Result<()> {
    let mut reg = AccountRegistry::new();
    let mut a = account("s1");
    a.config.client_secret = SecretBuffer::from("cs");
    a.store_tokens("A", None, 3600, None, 0, true);
    reg.insert(a);

    reg.lock("pw")?;
    assert!(reg.is_locked());
    let sealed = reg.find("s1").expect("loaded");
    assert_ne!(sealed.config.refresh_token.as_str(), "R");
    assert_ne!(sealed.access_token.as_str(), "A");

    reg.unlock("pw")?;
    assert!(!reg.is_locked());
    let open = reg.find("s1").expect("loaded");
    assert_eq!(open.config.refresh_token.as_str(), "R");
    assert_eq!(open.config.client_secret.as_str(), "cs");
    assert_eq!(open.access_token.as_str(), "A");
    Ok(())
}

#[test]
fn unlock_with_wrong_password_leaves_registry_locked() -> anyhow::Result<()> {
    let mut reg = AccountRegistry::new();
    reg.insert(account("s1"));
    reg.lock("pw")?;

    let sealed_before = reg.find("s1").expect("loaded").config.refresh_token.duplicate();
    assert_eq!(reg.unlock("wrong"), Err(AgentError::BadPassword));
    assert!(reg.is_locked());
    // Nothing was touched by the failed attempt.
    assert_eq!(reg.find("s1").expect("loaded").config.refresh_token, sealed_before);

    reg.unlock("pw")?;
    assert_eq!(reg.find("s1").expect("loaded").config.refresh_token.as_str(), "R");
    Ok(())
}

#[test]
fn double_lock_and_spurious_unlock_are_rejected() -> anyhow::Result<()> {
    let mut reg = AccountRegistry::new();
    assert_eq!(reg.unlock("pw"), Err(AgentError::AgentNotLocked));
    reg.lock("pw")?;
    assert_eq!(reg.lock("pw"), Err(AgentError::AgentLocked));
    Ok(())
}

#[test]
fn empty_registry_still_locks_and_verifies_password() -> anyhow::Result<()> {
    let mut reg = AccountRegistry::new();
    reg.lock("pw")?;
    assert_eq!(reg.unlock("nope"), Err(AgentError::BadPassword));
    reg.unlock("pw")?;
    assert!(!reg.is_locked());
    Ok(())
}
