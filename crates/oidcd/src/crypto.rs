// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key derivation and field sealing for the registry lock, plus random
//! protocol material (state, verifier, salts).
//!
//! A sealed field is `base64(salt || nonce || AES-256-GCM(key, field))`
//! where `key` is derived from the lock password with Argon2id and the
//! per-lock salt.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use argon2::Argon2;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use rand::Rng;
use zeroize::Zeroize;

use crate::error::AgentError;

/// AES-256-GCM key length in bytes.
pub const KEY_LEN: usize = 32;

/// GCM nonce length in bytes (96 bits).
pub const NONCE_LEN: usize = 12;

/// Argon2id salt length in bytes.
pub const SALT_LEN: usize = 16;

/// A derived lock key, wiped on drop.
pub struct LockKey([u8; KEY_LEN]);

impl Drop for LockKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Derive a 256-bit key from a password and salt using Argon2id with the
/// default (memory-hard) parameters.
pub fn derive_key(password: &[u8], salt: &[u8]) -> Result<LockKey, AgentError> {
    let mut key = [0u8; KEY_LEN];
    Argon2::default()
        .hash_password_into(password, salt, &mut key)
        .map_err(|e| AgentError::Internal(format!("key derivation failed: {e}")))?;
    Ok(LockKey(key))
}

/// Generate a random Argon2id salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill(&mut salt);
    salt
}

/// Seal `plaintext` under `key`, embedding `salt` in the blob.
pub fn seal(key: &LockKey, salt: &[u8; SALT_LEN], plaintext: &[u8]) -> Result<String, AgentError> {
    let cipher = Aes256Gcm::new_from_slice(&key.0)
        .map_err(|e| AgentError::Internal(format!("cipher init failed: {e}")))?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::rng().fill(&mut nonce_bytes);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| AgentError::Internal(format!("encryption failed: {e}")))?;

    let mut blob = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(salt);
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(blob))
}

/// Open a sealed blob with `key`. Fails with [`AgentError::BadPassword`]
/// on authentication failure (wrong key or tampered data).
pub fn open(key: &LockKey, blob: &str) -> Result<Vec<u8>, AgentError> {
    let raw = STANDARD
        .decode(blob)
        .map_err(|_| AgentError::Internal("corrupt sealed field".to_owned()))?;
    if raw.len() < SALT_LEN + NONCE_LEN {
        return Err(AgentError::Internal("sealed field too short".to_owned()));
    }
    let (_, rest) = raw.split_at(SALT_LEN);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);

    let cipher = Aes256Gcm::new_from_slice(&key.0)
        .map_err(|e| AgentError::Internal(format!("cipher init failed: {e}")))?;
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| AgentError::BadPassword)
}

/// Random URL-safe base64 string covering `len` bytes of entropy.
///
/// Used for the code-flow `state` (24 bytes) and the PKCE verifier
/// (64 bytes, within the 43..=128 character range of RFC 7636).
pub fn random_base64url(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rng().fill(bytes.as_mut_slice());
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
#[path = "crypto_tests.rs"]
mod tests;
