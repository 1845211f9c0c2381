// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `forge-provisioner-shell download <remote> <local>` - Copy a file from the machine

use anyhow::{Context, Result};
use clap::Args;
use forge_ssh::{SshClient, Transport};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Path on the machine
    pub remote: String,

    /// Local destination
    pub local: PathBuf,
}

/// Fetch the remote file and apply its mode locally
pub async fn handle<T: Transport>(client: &SshClient<T>, args: &DownloadArgs) -> Result<()> {
    let mut file = tokio::fs::File::create(&args.local)
        .await
        .with_context(|| format!("creating {}", args.local.display()))?;
    let header = client
        .download(&mut file, &args.remote)
        .await
        .with_context(|| format!("downloading {}", args.remote))?;
    drop(file);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(header.mode);
        tokio::fs::set_permissions(&args.local, permissions)
            .await
            .with_context(|| format!("setting mode on {}", args.local.display()))?;
    }

    tracing::info!(
        remote = %args.remote,
        local = %args.local.display(),
        bytes = header.length,
        mode = format_args!("{:04o}", header.mode),
        "downloaded"
    );
    Ok(())
}
