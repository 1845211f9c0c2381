// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `forge-provisioner-shell run` - Run a provisioner script

use super::remote_exit;
use anyhow::{bail, Context, Result};
use clap::Args;
use forge_ssh::{SshClient, Transport};
use std::path::PathBuf;
use tokio::io::AsyncWrite;

const SCRIPT_MODE: u32 = 0o755;
const SHELL: &str = "/bin/sh";

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Script text
    #[arg(long, env = "FORGE_SCRIPT", hide_env_values = true)]
    pub script: Option<String>,

    /// Read the script from a local file
    #[arg(long, conflicts_with = "script")]
    pub script_file: Option<PathBuf>,

    /// Run id used to name the remote script
    #[arg(long, env = "FORGE_PROVISIONER_ID")]
    pub id: Option<String>,
}

/// A script ready to ship
#[derive(Debug)]
pub struct Prepared {
    pub script: String,
    pub remote_path: String,
}

impl RunArgs {
    pub async fn prepare(self) -> Result<Prepared> {
        let script = match (self.script, self.script_file) {
            (Some(script), _) => script,
            (None, Some(path)) => tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("reading script {}", path.display()))?,
            (None, None) => bail!("no script given: pass --script, --script-file or set FORGE_SCRIPT"),
        };
        if script.trim().is_empty() {
            bail!("script is empty");
        }
        let id = self
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        Ok(Prepared {
            script,
            remote_path: remote_script_path(&id),
        })
    }
}

/// `/tmp/forge-<id>.sh`, keeping only characters safe to pass unquoted
pub fn remote_script_path(id: &str) -> String {
    let safe: String = id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    format!("/tmp/forge-{}.sh", safe)
}

/// Upload, execute and remove the script; returns the script's exit code
pub async fn handle<T, O, E>(
    client: &SshClient<T>,
    prepared: Prepared,
    stdout: &mut O,
    stderr: &mut E,
) -> Result<u32>
where
    T: Transport,
    O: AsyncWrite + Unpin + Send,
    E: AsyncWrite + Unpin + Send,
{
    let Prepared {
        script,
        remote_path,
    } = prepared;
    client
        .upload(&mut script.as_bytes(), &remote_path, SCRIPT_MODE)
        .await
        .with_context(|| format!("uploading script to {}", remote_path))?;

    let command = format!("{} {}", SHELL, remote_path);
    let result = remote_exit(client.run(&command, stdout, stderr).await);

    let cleanup = format!("rm -f {}", remote_path);
    if let Err(e) = client
        .run(&cleanup, &mut tokio::io::sink(), &mut tokio::io::sink())
        .await
    {
        tracing::warn!(path = %remote_path, error = %e, "failed to remove remote script");
    }

    let code = result.context("running script")?;
    if code == 0 {
        tracing::info!("script succeeded");
    } else {
        tracing::error!(exit_code = code, "script failed");
    }
    Ok(code)
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
