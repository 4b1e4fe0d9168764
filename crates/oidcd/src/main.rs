// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::Parser;

use oidcd::config::{AgentConfig, OIDC_PID_ENV_NAME, OIDC_SOCK_ENV_NAME};
use oidcd::ipc::AgentSocket;

#[derive(Parser)]
#[command(name = "oidcd", version, about = "Agent that manages OIDC access tokens for local applications.")]
struct Cli {
    /// Kill the current agent (given by the OIDCD_PID environment variable).
    #[arg(short = 'k', long)]
    kill: bool,

    /// Set the log level to DEBUG.
    #[arg(short = 'g', long)]
    debug: bool,

    /// Run oidcd on the console, without daemonizing.
    #[arg(short = 'c', long)]
    console: bool,

    #[command(flatten)]
    config: AgentConfig,
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "oidcd=debug" } else { "oidcd=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if cli.kill {
        std::process::exit(kill_agent());
    }

    // The socket exists (and its env line is printed) before the daemon
    // fork, so the invoking shell can eval the output.
    let socket = match AgentSocket::bind(cli.config.socket_dir.as_deref()) {
        Ok(socket) => socket,
        Err(e) => {
            eprintln!("could not create agent socket: {e:#}");
            std::process::exit(1);
        }
    };
    println!("{OIDC_SOCK_ENV_NAME}={}; export {OIDC_SOCK_ENV_NAME};", socket.path().display());

    if !cli.console {
        daemonize();
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("could not start runtime: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = runtime.block_on(oidcd::run(cli.config, socket)) {
        tracing::error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

/// Kill the agent advertised by the environment, unlink its socket, and
/// print the matching `unset` lines.
fn kill_agent() -> i32 {
    let pid_str = match std::env::var(OIDC_PID_ENV_NAME) {
        Ok(value) => value,
        Err(_) => {
            eprintln!("{OIDC_PID_ENV_NAME} not set, cannot kill agent");
            return 1;
        }
    };
    let pid: i32 = match pid_str.parse() {
        Ok(pid) if pid > 0 => pid,
        _ => {
            eprintln!("{OIDC_PID_ENV_NAME} not set to a valid pid: {pid_str}");
            return 1;
        }
    };
    if unsafe { libc::kill(pid, libc::SIGTERM) } == -1 {
        eprintln!("kill: {}", std::io::Error::last_os_error());
        return 1;
    }
    if let Ok(sock) = std::env::var(OIDC_SOCK_ENV_NAME) {
        let path = PathBuf::from(sock);
        let _ = std::fs::remove_file(&path);
        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir(dir);
        }
    }
    println!("unset {OIDC_SOCK_ENV_NAME};");
    println!("unset {OIDC_PID_ENV_NAME};");
    println!("echo Agent pid {pid} killed;");
    0
}

/// Classic double fork. The intermediate parent prints the final PID so
/// the invoking shell can export it.
fn daemonize() {
    unsafe {
        match libc::fork() {
            -1 => {
                eprintln!("fork: {}", std::io::Error::last_os_error());
                std::process::exit(1);
            }
            0 => {}
            _ => std::process::exit(0),
        }
        if libc::setsid() < 0 {
            std::process::exit(1);
        }
        libc::signal(libc::SIGHUP, libc::SIG_IGN);
        match libc::fork() {
            -1 => {
                eprintln!("fork: {}", std::io::Error::last_os_error());
                std::process::exit(1);
            }
            0 => {}
            pid => {
                println!("{OIDC_PID_ENV_NAME}={pid}; export {OIDC_PID_ENV_NAME};");
                println!("echo Agent pid ${OIDC_PID_ENV_NAME}");
                std::process::exit(0);
            }
        }
        let _ = std::env::set_current_dir("/");
        libc::umask(0);
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_RDWR);
        if devnull >= 0 {
            libc::dup2(devnull, 0);
            libc::dup2(devnull, 1);
            libc::dup2(devnull, 2);
            if devnull > 2 {
                libc::close(devnull);
            }
        }
    }
}
