// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! oidcd: a user-session agent that obtains, caches, refreshes, and
//! hands out OIDC access tokens for named accounts over a unix socket,
//! so applications never see the user's password and do not re-implement
//! the OIDC flows themselves.

pub mod account;
pub mod callback;
pub mod config;
pub mod crypto;
pub mod error;
pub mod flow;
pub mod frontend;
pub mod ipc;
pub mod issuer;
pub mod reaper;
pub mod registry;
pub mod secret;
pub mod util;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::AgentConfig;
use crate::frontend::FrontendChannel;
use crate::ipc::dispatch::AgentContext;
use crate::ipc::AgentSocket;

/// Timeout for any single request to an OIDC provider.
const PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

/// How often the background reaper checks for expired accounts.
const REAPER_INTERVAL: Duration = Duration::from_secs(1);

/// Upper bound on graceful-shutdown cleanup.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Run the agent until SIGTERM/SIGINT, then wipe the registry and unlink
/// the socket.
pub async fn run(config: AgentConfig, socket: AgentSocket) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();

    let http = reqwest::Client::builder().timeout(PROVIDER_TIMEOUT).build()?;
    let frontend = match config.prompter.as_deref() {
        Some(template) => FrontendChannel::spawn(template)?,
        None => FrontendChannel::disconnected(),
    };
    let ctx = Arc::new(AgentContext::new(http, frontend, config.options()));

    spawn_signal_handler(shutdown.clone());
    tokio::spawn(reaper::run(
        Arc::clone(&ctx.registry),
        REAPER_INTERVAL,
        shutdown.clone(),
    ));

    let (listener, socket_path, socket_dir) = socket.into_parts()?;
    tracing::info!(socket = %socket_path.display(), "oidcd listening");
    ipc::serve(listener, Arc::clone(&ctx), shutdown.clone()).await;

    // Graceful shutdown: secrets first, filesystem second, bounded.
    let cleanup = async {
        ctx.registry.lock().await.remove_all();
        ipc::cleanup_socket(&socket_path, &socket_dir);
    };
    if tokio::time::timeout(SHUTDOWN_GRACE, cleanup).await.is_err() {
        tracing::warn!("cleanup exceeded the shutdown grace period");
        ipc::cleanup_socket(&socket_path, &socket_dir);
    }
    tracing::info!("oidcd stopped");
    Ok(())
}

/// SIGTERM and SIGINT stop the agent; SIGHUP is ignored.
fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).ok();
        let mut sigint = signal(SignalKind::interrupt()).ok();
        let mut sighup = signal(SignalKind::hangup()).ok();

        loop {
            tokio::select! {
                _ = recv_or_pending(&mut sigterm) => {
                    tracing::info!("received SIGTERM, shutting down");
                    shutdown.cancel();
                    return;
                }
                _ = recv_or_pending(&mut sigint) => {
                    tracing::info!("received SIGINT, shutting down");
                    shutdown.cancel();
                    return;
                }
                _ = recv_or_pending(&mut sighup) => {
                    tracing::debug!("ignoring SIGHUP");
                }
            }
        }
    });
}

async fn recv_or_pending(signal: &mut Option<tokio::signal::unix::Signal>) {
    match signal {
        Some(s) => {
            s.recv().await;
        }
        None => std::future::pending().await,
    }
}
