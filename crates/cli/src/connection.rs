// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection settings shared by every subcommand
//!
//! Each flag falls back to the environment variable the execution unit
//! sets from the build's credentials secret.

use anyhow::{Context, Result};
use clap::Args;
use forge_ssh::{ClientOptions, Credentials, SshClient, Transport};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Machine to connect to
    #[arg(long, env = "FORGE_SSH_HOST")]
    pub host: String,

    /// SSH port
    #[arg(long, env = "FORGE_SSH_PORT", default_value_t = 22)]
    pub port: u16,

    /// Login user
    #[arg(long = "user", env = "FORGE_SSH_USERNAME", default_value = "")]
    pub username: String,

    /// Login password
    #[arg(long, env = "FORGE_SSH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// PEM private key, preferred over the password
    #[arg(long = "key", env = "FORGE_SSH_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// Read the private key from a file instead
    #[arg(long = "key-file", conflicts_with = "private_key")]
    pub private_key_file: Option<PathBuf>,

    /// Seconds between keepalive probes, 0 disables them
    #[arg(long, env = "FORGE_SSH_KEEPALIVE", default_value_t = 30)]
    pub keepalive: u64,

    /// Run commands under a pseudo-terminal
    #[arg(long, env = "FORGE_SSH_PTY")]
    pub pty: bool,

    /// How long to wait for sshd to answer
    #[arg(
        long,
        env = "FORGE_SSH_WAIT",
        default_value = "5m",
        value_parser = humantime::parse_duration
    )]
    pub wait: Duration,
}

impl ConnectionArgs {
    pub fn credentials(&self) -> Result<Credentials> {
        let private_key = match (&self.private_key, &self.private_key_file) {
            (Some(key), _) => key.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("reading private key {}", path.display()))?,
            (None, None) => String::new(),
        };
        Ok(Credentials {
            username: self.username.clone(),
            password: self.password.clone().unwrap_or_default(),
            private_key,
        })
    }

    pub fn client<T: Transport>(&self, transport: T) -> Result<SshClient<T>> {
        let options = ClientOptions {
            keepalive: Duration::from_secs(self.keepalive),
            pty: self.pty,
        };
        Ok(SshClient::new(transport, self.host.clone(), self.credentials()?)
            .with_port(self.port)
            .with_options(options))
    }
}

/// Wait for sshd within `max_wait`, then open the session
pub async fn open<T: Transport>(client: &SshClient<T>, max_wait: Duration) -> Result<()> {
    tracing::info!(host = client.host(), port = client.port(), "waiting for ssh");
    client
        .wait_for_ssh(max_wait)
        .await
        .with_context(|| format!("{}:{} never answered", client.host(), client.port()))?;
    client.connect().await.context("connecting")?;
    Ok(())
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
