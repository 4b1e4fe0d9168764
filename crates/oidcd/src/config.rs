// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

/// Name of the environment variable advertising the agent socket path.
pub const OIDC_SOCK_ENV_NAME: &str = "OIDC_SOCK";

/// Name of the environment variable advertising the agent PID.
pub const OIDC_PID_ENV_NAME: &str = "OIDCD_PID";

/// Configuration for the agent daemon.
#[derive(Debug, Clone, clap::Args)]
pub struct AgentConfig {
    /// Default account lifetime in seconds; 0 keeps accounts loaded until
    /// shutdown.
    #[arg(short = 't', long, default_value_t = 0, env = "OIDCD_LIFETIME")]
    pub lifetime: u64,

    /// Never ask the frontend to autoload a missing account.
    #[arg(long, env = "OIDCD_NO_AUTOLOAD")]
    pub no_autoload: bool,

    /// Ask the user to confirm every access-token request.
    #[arg(long, env = "OIDCD_CONFIRM")]
    pub confirm: bool,

    /// Launch command for the frontend prompter (run via `sh -c`); its
    /// stdin/stdout become the frontend pipe.
    #[arg(long, env = "OIDCD_PROMPTER")]
    pub prompter: Option<String>,

    /// Directory for the agent socket. Defaults to a fresh, private
    /// directory under the system temp dir.
    #[arg(long, env = "OIDCD_SOCKET_DIR")]
    pub socket_dir: Option<PathBuf>,
}

/// The per-process dispatcher defaults derived from the CLI.
#[derive(Debug, Clone, Default)]
pub struct AgentOptions {
    pub default_timeout: u64,
    pub no_autoload: bool,
    pub confirm: bool,
}

impl AgentConfig {
    pub fn options(&self) -> AgentOptions {
        AgentOptions {
            default_timeout: self.lifetime,
            no_autoload: self.no_autoload,
            confirm: self.confirm,
        }
    }
}
