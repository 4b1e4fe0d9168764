// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wipe-on-drop buffer for credential material.
//!
//! Every byte string that ever holds a secret (client secret, refresh or
//! access token, password, PKCE verifier) lives in a [`SecretBuffer`].
//! The buffer zeroizes its memory on drop and on `clear()`. Copies are
//! explicit via [`SecretBuffer::duplicate`]; there is no `Clone` impl.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A byte buffer that is wiped when dropped.
#[derive(Default, Zeroize, ZeroizeOnDrop)]
pub struct SecretBuffer(Vec<u8>);

impl SecretBuffer {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Read-only view of the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Read-only view as UTF-8. Secrets on the wire are always UTF-8;
    /// non-UTF-8 content (sealed blobs are base64, so this cannot happen
    /// in practice) yields an empty string.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Wipe the contents in place.
    pub fn clear(&mut self) {
        self.0.zeroize();
        self.0.clear();
    }

    /// Replace the contents, wiping the previous value.
    pub fn set(&mut self, bytes: Vec<u8>) {
        self.0.zeroize();
        self.0 = bytes;
    }

    /// Explicit copy. Named so that every duplication of secret material
    /// is visible at the call site.
    pub fn duplicate(&self) -> Self {
        Self(self.0.clone())
    }

    /// Take the contents out, leaving the buffer empty (no wipe of the
    /// returned bytes; the caller owns them now).
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.0)
    }
}

impl From<&str> for SecretBuffer {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<String> for SecretBuffer {
    fn from(mut s: String) -> Self {
        let bytes = s.as_bytes().to_vec();
        s.zeroize();
        Self(bytes)
    }
}

impl PartialEq for SecretBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for SecretBuffer {}

impl fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("SecretBuffer(empty)")
        } else {
            f.write_str("SecretBuffer(***)")
        }
    }
}

// Account configs cross the IPC boundary as JSON with secrets in the
// clear (the socket is 0600 and per-user), so serde exposes the value.
impl Serialize for SecretBuffer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SecretBuffer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s))
    }
}

#[cfg(test)]
#[path = "secret_tests.rs"]
mod tests;
