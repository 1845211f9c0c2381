// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transport seam between the client and an SSH implementation

mod openssh;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use openssh::OpenSshTransport;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeChannel, FakeCommand, FakeConnection, FakeFile, FakeTransport, TransportCall};

use crate::credentials::AuthMethod;
use crate::error::SshError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};

/// Port dialed when none is configured
pub const DEFAULT_PORT: u16 = 22;

/// Bound on establishing a connection
pub const DIAL_TIMEOUT: Duration = Duration::from_secs(60);

/// Global request name sent as a keepalive probe
pub const KEEPALIVE_REQUEST: &str = "forge-ssh";

/// Remote endpoint and login name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
    pub username: String,
}

impl Target {
    /// `host:port`, the dial address
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Terminal mode opcodes set on a requested pseudo-terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalMode {
    Echo,
    InputSpeed,
    OutputSpeed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtyRequest {
    pub term: String,
    pub cols: u32,
    pub rows: u32,
    pub modes: Vec<(TerminalMode, u32)>,
}

impl PtyRequest {
    /// 80x40 terminal with echo off at 14.4 kbaud, typed after `$TERM`
    pub fn standard() -> Self {
        let term = std::env::var("TERM")
            .ok()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "xterm".to_string());
        Self {
            term,
            cols: 80,
            rows: 40,
            modes: vec![
                (TerminalMode::Echo, 0),
                (TerminalMode::InputSpeed, 14400),
                (TerminalMode::OutputSpeed, 14400),
            ],
        }
    }

    /// The modes and window size as `stty` operands
    pub fn stty_args(&self) -> String {
        let mut args: Vec<String> = self
            .modes
            .iter()
            .map(|(mode, value)| match mode {
                TerminalMode::Echo if *value == 0 => "-echo".to_string(),
                TerminalMode::Echo => "echo".to_string(),
                TerminalMode::InputSpeed => format!("ispeed {}", value),
                TerminalMode::OutputSpeed => format!("ospeed {}", value),
            })
            .collect();
        args.push(format!("rows {}", self.rows));
        args.push(format!("cols {}", self.cols));
        args.join(" ")
    }
}

pub type BoxedReader<'a> = Box<dyn AsyncRead + Send + Unpin + 'a>;
pub type BoxedWriter<'a> = Box<dyn AsyncWrite + Send + Unpin + 'a>;

/// Standard streams wired to a remote command
pub struct ExecIo<'a> {
    /// `None` closes the remote stdin immediately
    pub stdin: Option<BoxedReader<'a>>,
    pub stdout: BoxedWriter<'a>,
    pub stderr: BoxedWriter<'a>,
}

impl<'a> ExecIo<'a> {
    /// No input, output discarded
    pub fn discard() -> Self {
        Self {
            stdin: None,
            stdout: Box::new(tokio::io::sink()),
            stderr: Box::new(tokio::io::sink()),
        }
    }
}

/// Opens authenticated connections
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;

    async fn dial(
        &self,
        target: &Target,
        auth: &AuthMethod,
        timeout: Duration,
    ) -> Result<Self::Connection, SshError>;
}

/// One authenticated connection multiplexing channels
#[async_trait]
pub trait Connection: Send + Sync + 'static {
    type Channel: Channel;

    async fn open_channel(&self) -> Result<Self::Channel, SshError>;

    /// Send a [`KEEPALIVE_REQUEST`] global request, expecting a reply
    async fn keepalive(&self) -> Result<(), SshError>;

    async fn close(&self) -> Result<(), SshError>;
}

/// A session channel that runs a single command
#[async_trait]
pub trait Channel: Send {
    async fn request_pty(&mut self, pty: &PtyRequest) -> Result<(), SshError>;

    /// Run `command` to completion and return its exit status
    async fn exec(&mut self, command: &str, io: ExecIo<'_>) -> Result<u32, SshError>;
}
