// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background eviction of accounts whose lifetime has run out.
//!
//! The dispatcher also reaps at the head of every request, so this task
//! only bounds how long an expired record can linger while the agent is
//! idle.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::registry::AccountRegistry;
use crate::util::epoch_secs;

/// Run the reaper until shutdown.
pub async fn run(
    registry: Arc<Mutex<AccountRegistry>>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = ticker.tick() => {
                let mut registry = registry.lock().await;
                // Sealed fields stay sealed; eviction works regardless of
                // the lock state.
                registry.reap(epoch_secs());
            }
        }
    }
}
