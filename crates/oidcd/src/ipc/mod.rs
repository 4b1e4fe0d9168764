// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The agent socket: a unix-domain stream socket in a private directory,
//! serving one NUL-framed JSON request/response pair at a time per
//! connection.

pub mod dispatch;
pub mod framing;
pub mod protocol;

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::BufReader;
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;

use crate::crypto::random_base64url;
use crate::ipc::dispatch::AgentContext;
use crate::ipc::protocol::Response;

/// The bound agent socket and the directory that holds it.
///
/// Binding happens with the blocking std listener so it can run before
/// the daemon fork and before the async runtime exists.
pub struct AgentSocket {
    dir: PathBuf,
    path: PathBuf,
    listener: std::os::unix::net::UnixListener,
}

impl AgentSocket {
    /// Create the socket directory (mode 0700) and bind the socket
    /// (mode 0600).
    pub fn bind(socket_dir: Option<&Path>) -> anyhow::Result<Self> {
        let dir = match socket_dir {
            Some(dir) => dir.to_path_buf(),
            None => std::env::temp_dir().join(format!("oidc-{}", random_base64url(6))),
        };
        fs::create_dir_all(&dir)?;
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o700))?;

        let path = dir.join("oidcd.sock");
        // Remove a stale socket from a previous run.
        let _ = fs::remove_file(&path);
        let listener = std::os::unix::net::UnixListener::bind(&path)?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        listener.set_nonblocking(true)?;

        Ok(Self { dir, path, listener })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hand the listener over to the async runtime.
    pub fn into_parts(self) -> anyhow::Result<(UnixListener, PathBuf, PathBuf)> {
        let listener = UnixListener::from_std(self.listener)?;
        Ok((listener, self.path, self.dir))
    }
}

/// Unlink the socket and its directory.
pub fn cleanup_socket(path: &Path, dir: &Path) {
    let _ = fs::remove_file(path);
    let _ = fs::remove_dir(dir);
}

/// Accept connections until shutdown.
pub async fn serve(listener: UnixListener, ctx: Arc<AgentContext>, shutdown: CancellationToken) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            accept = listener.accept() => match accept {
                Ok((stream, _)) => {
                    let ctx = Arc::clone(&ctx);
                    let shutdown = shutdown.clone();
                    tokio::spawn(async move {
                        handle_connection(stream, ctx, shutdown).await;
                    });
                }
                Err(e) => {
                    tracing::debug!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Serve one client connection: requests are handled strictly in order,
/// one response per request, until the peer closes the stream.
async fn handle_connection(stream: UnixStream, ctx: Arc<AgentContext>, shutdown: CancellationToken) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => return,
            frame = framing::read_frame(&mut reader) => frame,
        };
        match frame {
            Ok(Some(payload)) => {
                let response = dispatch::handle_frame(&ctx, &payload).await;
                if framing::write_frame(&mut write_half, &response.to_json()).await.is_err() {
                    return;
                }
            }
            Ok(None) => return,
            Err(e) => {
                // Framing violations get one response, then the
                // connection is dropped.
                let response = Response::from_error(&e);
                let _ = framing::write_frame(&mut write_half, &response.to_json()).await;
                return;
            }
        }
    }
}
