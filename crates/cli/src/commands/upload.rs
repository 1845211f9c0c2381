// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `forge-provisioner-shell upload <local> <remote>` - Copy a file to the machine

use super::parse_mode;
use anyhow::{Context, Result};
use clap::Args;
use forge_ssh::{SshClient, Transport};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Local file to send
    pub local: PathBuf,

    /// Destination path on the machine
    pub remote: String,

    /// Octal permissions for the remote file
    #[arg(long, default_value = "644", value_parser = parse_mode)]
    pub mode: u32,
}

pub struct Prepared {
    file: tokio::fs::File,
    local: PathBuf,
    remote: String,
    mode: u32,
}

impl UploadArgs {
    pub async fn prepare(self) -> Result<Prepared> {
        let file = tokio::fs::File::open(&self.local)
            .await
            .with_context(|| format!("opening {}", self.local.display()))?;
        Ok(Prepared {
            file,
            local: self.local,
            remote: self.remote,
            mode: self.mode,
        })
    }
}

pub async fn handle<T: Transport>(client: &SshClient<T>, prepared: Prepared) -> Result<()> {
    let Prepared {
        mut file,
        local,
        remote,
        mode,
    } = prepared;
    client
        .upload(&mut file, &remote, mode)
        .await
        .with_context(|| format!("uploading {} to {}", local.display(), remote))?;
    tracing::info!(local = %local.display(), remote = %remote, mode = format_args!("{:04o}", mode), "uploaded");
    Ok(())
}
