// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The account registry: loaded accounts keyed by shortname, with a
//! secondary lookup on the in-flight code-flow `state`, cooperative
//! expiry, and whole-registry locking.
//!
//! Locking seals every secret field of every record under a key derived
//! from the lock password (Argon2id + AES-256-GCM); neither the key nor
//! the password is retained. A sealed sentinel verifies the password on
//! unlock before any field is touched, so a wrong password never leaves
//! the registry half-open.

use std::collections::HashMap;

use crate::account::Account;
use crate::crypto;
use crate::error::AgentError;

/// Sentinel sealed at lock time; opening it proves the password.
const LOCK_CHECK: &[u8] = b"oidcd-lock-check";

struct LockState {
    salt: [u8; crypto::SALT_LEN],
    check: String,
}

/// Loaded accounts, unique by shortname.
#[derive(Default)]
pub struct AccountRegistry {
    accounts: HashMap<String, Account>,
    lock: Option<LockState>,
}

impl AccountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_some()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Insert a record. A record with the same shortname is replaced; the
    /// replaced record's secrets are wiped on drop.
    pub fn insert(&mut self, account: Account) {
        self.accounts.insert(account.shortname().to_owned(), account);
    }

    pub fn find(&self, shortname: &str) -> Option<&Account> {
        self.accounts.get(shortname)
    }

    pub fn find_mut(&mut self, shortname: &str) -> Option<&mut Account> {
        self.accounts.get_mut(shortname)
    }

    /// Linear scan over in-flight code-flow states. States are short-lived
    /// so the candidate set is tiny.
    pub fn find_by_state(&self, state: &str) -> Option<&Account> {
        self.accounts.values().find(|a| a.used_state.as_deref() == Some(state))
    }

    pub fn find_by_state_mut(&mut self, state: &str) -> Option<&mut Account> {
        self.accounts.values_mut().find(|a| a.used_state.as_deref() == Some(state))
    }

    pub fn remove(&mut self, shortname: &str) -> bool {
        self.accounts.remove(shortname).is_some()
    }

    /// Drop every record, wiping all secrets.
    pub fn remove_all(&mut self) {
        for account in self.accounts.values_mut() {
            account.wipe();
        }
        self.accounts.clear();
    }

    /// Evict every record whose death has passed. Returns the number of
    /// evicted records.
    pub fn reap(&mut self, now: u64) -> usize {
        let before = self.accounts.len();
        self.accounts.retain(|_, a| a.death == 0 || a.death > now);
        let evicted = before - self.accounts.len();
        if evicted > 0 {
            tracing::debug!(evicted, "reaped expired accounts");
        }
        evicted
    }

    /// Sorted shortnames of all loaded accounts.
    pub fn shortnames(&self) -> Vec<String> {
        let mut names: Vec<String> = self.accounts.keys().cloned().collect();
        names.sort();
        names
    }

    /// Seal every secret field of every record under `password`.
    pub fn lock(&mut self, password: &str) -> Result<(), AgentError> {
        if self.lock.is_some() {
            return Err(AgentError::AgentLocked);
        }
        let salt = crypto::generate_salt();
        let key = crypto::derive_key(password.as_bytes(), &salt)?;
        let check = crypto::seal(&key, &salt, LOCK_CHECK)?;

        for account in self.accounts.values_mut() {
            for field in account.secret_fields_mut() {
                if field.is_empty() {
                    continue;
                }
                let sealed = crypto::seal(&key, &salt, field.as_bytes())?;
                field.set(sealed.into_bytes());
            }
        }
        self.lock = Some(LockState { salt, check });
        tracing::info!(accounts = self.accounts.len(), "registry locked");
        Ok(())
    }

    /// Open every sealed field. A wrong password fails the sentinel check
    /// and leaves the registry locked with nothing touched.
    pub fn unlock(&mut self, password: &str) -> Result<(), AgentError> {
        let Some(ref lock) = self.lock else {
            return Err(AgentError::AgentNotLocked);
        };
        let key = crypto::derive_key(password.as_bytes(), &lock.salt)?;
        crypto::open(&key, &lock.check)?;

        // Stage all plaintexts before committing so a corrupt field cannot
        // leave the registry in a mixed state.
        let mut staged: Vec<(String, Vec<Option<Vec<u8>>>)> = Vec::new();
        for (name, account) in self.accounts.iter_mut() {
            let mut fields = Vec::new();
            for field in account.secret_fields_mut() {
                if field.is_empty() {
                    fields.push(None);
                } else {
                    fields.push(Some(crypto::open(&key, field.as_str())?));
                }
            }
            staged.push((name.clone(), fields));
        }
        for (name, fields) in staged {
            if let Some(account) = self.accounts.get_mut(&name) {
                for (field, plaintext) in account.secret_fields_mut().into_iter().zip(fields) {
                    if let Some(p) = plaintext {
                        field.set(p);
                    }
                }
            }
        }
        self.lock = None;
        tracing::info!("registry unlocked");
        Ok(())
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
