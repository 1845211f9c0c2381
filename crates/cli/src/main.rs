// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! forge-provisioner-shell - runs one provisioner step on a build machine

mod commands;
mod connection;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{download, run, upload};
use connection::ConnectionArgs;
use forge_ssh::{OpenSshTransport, SshClient, Transport};
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "forge-provisioner-shell",
    version,
    about = "Run provisioner scripts and copy files on a build machine over SSH"
)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a script, run it with /bin/sh, then remove it
    Run(run::RunArgs),
    /// Copy a local file to the machine
    Upload(upload::UploadArgs),
    /// Copy a file from the machine
    Download(download::DownloadArgs),
}

/// Inputs resolved before any network I/O
enum Action {
    Run(run::Prepared),
    Upload(upload::Prepared),
    Download(download::DownloadArgs),
}

impl Commands {
    async fn prepare(self) -> Result<Action> {
        Ok(match self {
            Commands::Run(args) => Action::Run(args.prepare().await?),
            Commands::Upload(args) => Action::Upload(args.prepare().await?),
            Commands::Download(args) => Action::Download(args),
        })
    }
}

fn main() -> ExitCode {
    setup_logging();
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(execute(cli)) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(u8::MAX)),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> Result<u32> {
    let client = cli.connection.client(OpenSshTransport::new())?;
    client.validate()?;
    let action = cli.command.prepare().await?;
    connection::open(&client, cli.connection.wait).await?;

    let result = dispatch(&client, action).await;
    client.disconnect().await;
    result
}

/// Perform `action` on a connected client, returning the exit code to report
async fn dispatch<T: Transport>(client: &SshClient<T>, action: Action) -> Result<u32> {
    match action {
        Action::Run(prepared) => {
            let mut stdout = tokio::io::stdout();
            let mut stderr = tokio::io::stderr();
            run::handle(client, prepared, &mut stdout, &mut stderr).await
        }
        Action::Upload(prepared) => {
            upload::handle(client, prepared).await?;
            Ok(0)
        }
        Action::Download(args) => {
            download::handle(client, &args).await?;
            Ok(0)
        }
    }
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
