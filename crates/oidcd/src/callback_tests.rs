// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn register_and_term() -> anyhow::Result<()> {
    let coordinator = CallbackCoordinator::new();
    coordinator.register("state-1").await;
    coordinator.register("state-2").await;
    assert_eq!(coordinator.active().await, 2);

    assert!(coordinator.term("state-1").await);
    assert!(!coordinator.term("state-1").await);
    assert_eq!(coordinator.active().await, 1);
    Ok(())
}

#[tokio::test]
async fn reregistering_a_state_replaces_it() -> anyhow::Result<()> {
    let coordinator = CallbackCoordinator::new();
    coordinator.register("state-1").await;
    coordinator.register("state-1").await;
    assert_eq!(coordinator.active().await, 1);
    Ok(())
}
