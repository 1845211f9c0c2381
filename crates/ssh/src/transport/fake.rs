// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory transport for testing
//!
//! Emulates a remote host with a small file table, scripted commands and
//! both ends of the single-file copy protocol.
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{BoxedReader, BoxedWriter, Channel, Connection, ExecIo, PtyRequest, Target, Transport};
use crate::credentials::AuthMethod;
use crate::error::SshError;
use crate::scp::{self, ACK};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};

/// Recorded transport call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Dial { target: Target, auth: &'static str },
    Keepalive,
    Close,
    Exec { command: String, pty: bool },
}

/// Canned result of a scripted remote command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FakeCommand {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: u32,
}

impl FakeCommand {
    pub fn prints(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            stdout: stdout.into(),
            ..Self::default()
        }
    }

    pub fn exits(exit_code: u32) -> Self {
        Self {
            exit_code,
            ..Self::default()
        }
    }

    pub fn with_stderr(mut self, stderr: impl Into<Vec<u8>>) -> Self {
        self.stderr = stderr.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeFile {
    pub mode: u32,
    pub content: Vec<u8>,
}

#[derive(Default)]
struct FakeRemote {
    files: HashMap<String, FakeFile>,
    raw_sources: HashMap<String, Vec<u8>>,
    commands: HashMap<String, FakeCommand>,
    /// Dials left to refuse before connecting
    refused_dials: Option<u32>,
    refuse_all_dials: bool,
    keepalive_fails: bool,
    calls: Vec<TransportCall>,
}

/// Fake transport for testing
#[derive(Clone, Default)]
pub struct FakeTransport {
    remote: Arc<Mutex<FakeRemote>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn remote(&self) -> MutexGuard<'_, FakeRemote> {
        self.remote.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<TransportCall> {
        self.remote().calls.clone()
    }

    pub fn keepalive_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, TransportCall::Keepalive))
            .count()
    }

    pub fn dial_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, TransportCall::Dial { .. }))
            .count()
    }

    /// Place a file on the remote host
    pub fn put_file(&self, path: &str, mode: u32, content: impl Into<Vec<u8>>) {
        self.remote().files.insert(
            path.to_string(),
            FakeFile {
                mode,
                content: content.into(),
            },
        );
    }

    pub fn file(&self, path: &str) -> Option<FakeFile> {
        self.remote().files.get(path).cloned()
    }

    /// Serve `bytes` verbatim to a copy source request for `path`
    pub fn serve_raw(&self, path: &str, bytes: impl Into<Vec<u8>>) {
        self.remote()
            .raw_sources
            .insert(path.to_string(), bytes.into());
    }

    pub fn on_command(&self, command: &str, result: FakeCommand) {
        self.remote().commands.insert(command.to_string(), result);
    }

    /// Refuse the next `n` dials
    pub fn refuse_dials(&self, n: u32) {
        self.remote().refused_dials = Some(n);
    }

    pub fn refuse_all_dials(&self) {
        self.remote().refuse_all_dials = true;
    }

    pub fn fail_keepalives(&self) {
        self.remote().keepalive_fails = true;
    }
}

#[async_trait]
impl Transport for FakeTransport {
    type Connection = FakeConnection;

    async fn dial(
        &self,
        target: &Target,
        auth: &AuthMethod,
        _timeout: Duration,
    ) -> Result<FakeConnection, SshError> {
        let mut remote = self.remote();
        remote.calls.push(TransportCall::Dial {
            target: target.clone(),
            auth: auth.kind(),
        });
        if remote.refuse_all_dials {
            return Err(SshError::Transport("connection refused".into()));
        }
        if let Some(left) = remote.refused_dials.filter(|n| *n > 0) {
            remote.refused_dials = Some(left - 1);
            return Err(SshError::Transport("connection refused".into()));
        }
        Ok(FakeConnection {
            remote: Arc::clone(&self.remote),
        })
    }
}

pub struct FakeConnection {
    remote: Arc<Mutex<FakeRemote>>,
}

impl FakeConnection {
    fn record(&self, call: TransportCall) -> bool {
        let mut remote = self.remote.lock().unwrap_or_else(|e| e.into_inner());
        remote.calls.push(call);
        remote.keepalive_fails
    }
}

#[async_trait]
impl Connection for FakeConnection {
    type Channel = FakeChannel;

    async fn open_channel(&self) -> Result<FakeChannel, SshError> {
        Ok(FakeChannel {
            remote: Arc::clone(&self.remote),
            pty: None,
        })
    }

    async fn keepalive(&self) -> Result<(), SshError> {
        if self.record(TransportCall::Keepalive) {
            return Err(SshError::Transport("keepalive request rejected".into()));
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), SshError> {
        self.record(TransportCall::Close);
        Ok(())
    }
}

pub struct FakeChannel {
    remote: Arc<Mutex<FakeRemote>>,
    pty: Option<PtyRequest>,
}

impl FakeChannel {
    fn remote(&self) -> MutexGuard<'_, FakeRemote> {
        self.remote.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn copy_sink(
        &self,
        dir: &str,
        stdin: &mut BoxedReader<'_>,
        stdout: &mut BoxedWriter<'_>,
    ) -> Result<u32, SshError> {
        stdout.write_all(&[ACK]).await?;
        let mut reader = BufReader::new(stdin);

        let mut line = Vec::new();
        reader.read_until(b'\n', &mut line).await?;
        let Some((mode, length, name)) = parse_sink_header(&line) else {
            stdout.write_all(b"\x01scp: protocol error\n").await?;
            return Ok(1);
        };
        stdout.write_all(&[ACK]).await?;

        let mut content = vec![0u8; length];
        let mut trailer = [0xffu8; 1];
        if reader.read_exact(&mut content).await.is_err()
            || reader.read_exact(&mut trailer).await.is_err()
            || trailer[0] != ACK
        {
            return Ok(1);
        }
        stdout.write_all(&[ACK]).await?;

        let path = match dir.trim_end_matches('/') {
            "" => format!("/{}", name),
            dir => format!("{}/{}", dir, name),
        };
        self.remote()
            .files
            .insert(path, FakeFile { mode, content });
        Ok(0)
    }

    async fn copy_source(
        &self,
        path: &str,
        stdin: &mut BoxedReader<'_>,
        stdout: &mut BoxedWriter<'_>,
    ) -> Result<u32, SshError> {
        let (raw, file) = {
            let remote = self.remote();
            (
                remote.raw_sources.get(path).cloned(),
                remote.files.get(path).cloned(),
            )
        };

        if let Some(raw) = raw {
            stdout.write_all(&raw).await?;
            tokio::io::copy(stdin, &mut tokio::io::sink()).await?;
            return Ok(0);
        }
        let Some(file) = file else {
            let message = format!("\x01scp: {}: No such file or directory\n", path);
            stdout.write_all(message.as_bytes()).await?;
            return Ok(1);
        };

        let (_, name) = scp::split_remote_path(path);
        if !wait_ack(stdin).await {
            return Ok(1);
        }
        let header = format!("C{:04o} {} {}\n", file.mode, file.content.len(), name);
        stdout.write_all(header.as_bytes()).await?;
        if !wait_ack(stdin).await {
            return Ok(1);
        }
        stdout.write_all(&file.content).await?;
        stdout.write_all(&[ACK]).await?;
        if !wait_ack(stdin).await {
            return Ok(1);
        }
        Ok(0)
    }
}

#[async_trait]
impl Channel for FakeChannel {
    async fn request_pty(&mut self, pty: &PtyRequest) -> Result<(), SshError> {
        self.pty = Some(pty.clone());
        Ok(())
    }

    async fn exec(&mut self, command: &str, io: ExecIo<'_>) -> Result<u32, SshError> {
        self.remote().calls.push(TransportCall::Exec {
            command: command.to_string(),
            pty: self.pty.is_some(),
        });

        let ExecIo {
            stdin,
            mut stdout,
            mut stderr,
        } = io;
        let mut stdin: BoxedReader<'_> = stdin.unwrap_or_else(|| Box::new(tokio::io::empty()));

        let sink_prefix = format!("{} -t ", scp::SCP_PROGRAM);
        let source_prefix = format!("{} -f ", scp::SCP_PROGRAM);

        let code = if let Some(dir) = command.strip_prefix(&sink_prefix) {
            self.copy_sink(&unquote(dir), &mut stdin, &mut stdout)
                .await?
        } else if let Some(path) = command.strip_prefix(&source_prefix) {
            self.copy_source(&unquote(path), &mut stdin, &mut stdout)
                .await?
        } else {
            let scripted = self.remote().commands.get(command).cloned();
            match scripted {
                Some(result) => {
                    stdout.write_all(&result.stdout).await?;
                    stderr.write_all(&result.stderr).await?;
                    result.exit_code
                }
                None => {
                    let message = format!("sh: {}: command not found\n", command);
                    stderr.write_all(message.as_bytes()).await?;
                    127
                }
            }
        };

        stdout.flush().await?;
        stderr.flush().await?;
        Ok(code)
    }
}

async fn wait_ack(stdin: &mut BoxedReader<'_>) -> bool {
    let mut byte = [0xffu8; 1];
    matches!(stdin.read_exact(&mut byte).await, Ok(_) if byte[0] == ACK)
}

fn parse_sink_header(line: &[u8]) -> Option<(u32, usize, String)> {
    let line = std::str::from_utf8(line).ok()?.strip_suffix('\n')?;
    let mut fields = line.splitn(3, ' ');
    let mode = u32::from_str_radix(fields.next()?.strip_prefix('C')?, 8).ok()?;
    let length = fields.next()?.parse().ok()?;
    let name = fields.next()?.to_string();
    Some((mode, length, name))
}

fn unquote(arg: &str) -> String {
    match arg.strip_prefix('\'').and_then(|a| a.strip_suffix('\'')) {
        Some(inner) => inner.replace(r"'\''", "'"),
        None => arg.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unquote_reverses_shell_quote() {
        for s in ["/tmp", "/tmp/my dir", "it's"] {
            assert_eq!(unquote(&scp::shell_quote(s)), s);
        }
    }

    #[test]
    fn sink_header_parser_accepts_client_headers() {
        assert_eq!(
            parse_sink_header(scp::upload_header(0o755, 4, "a.sh").as_bytes()),
            Some((0o755, 4, "a.sh".to_string()))
        );
        assert_eq!(parse_sink_header(b"junk\n"), None);
    }

    #[tokio::test]
    async fn refused_dials_run_out() {
        let transport = FakeTransport::new();
        transport.refuse_dials(1);
        let target = Target {
            host: "h".into(),
            port: 22,
            username: "u".into(),
        };
        let auth = AuthMethod::Password("p".into());
        let timeout = Duration::from_secs(1);

        assert!(transport.dial(&target, &auth, timeout).await.is_err());
        assert!(transport.dial(&target, &auth, timeout).await.is_ok());
        assert_eq!(transport.dial_count(), 2);
    }
}
