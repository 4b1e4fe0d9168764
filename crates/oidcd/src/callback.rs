// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bookkeeping for the out-of-process HTTP callback receiver.
//!
//! The receiver that catches the browser redirect lives outside the
//! agent; the agent only tracks which `state` values a receiver is
//! listening for, so `term_http` and a drained `state_lookup` can tear
//! the right one down.

use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::util::epoch_secs;

#[derive(Default)]
pub struct CallbackCoordinator {
    /// Active states and when they were registered.
    states: Mutex<HashMap<String, u64>>,
}

impl CallbackCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a receiver for `state`. A previous registration for
    /// the same state is replaced.
    pub async fn register(&self, state: &str) {
        self.states.lock().await.insert(state.to_owned(), epoch_secs());
        tracing::debug!(state = %state, "callback receiver registered");
    }

    /// Tear down the receiver for `state`. Returns whether one was
    /// registered.
    pub async fn term(&self, state: &str) -> bool {
        let removed = self.states.lock().await.remove(state).is_some();
        if removed {
            tracing::debug!(state = %state, "callback receiver terminated");
        }
        removed
    }

    pub async fn active(&self) -> usize {
        self.states.lock().await.len()
    }
}

#[cfg(test)]
#[path = "callback_tests.rs"]
mod tests;
