// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transport backed by the system `ssh` client
//!
//! A connection is an OpenSSH control master living in a private temp
//! directory. Channels are `ssh -S <socket>` invocations multiplexed over it.

use super::{Channel, Connection, ExecIo, PtyRequest, Target, Transport};
use crate::credentials::AuthMethod;
use crate::error::SshError;
use async_trait::async_trait;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::{NamedTempFile, TempDir};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Extra time granted to the `ssh` process beyond its own connect timeout
const DIAL_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct OpenSshTransport {
    ssh_program: PathBuf,
    sshpass_program: PathBuf,
}

impl Default for OpenSshTransport {
    fn default() -> Self {
        Self {
            ssh_program: PathBuf::from("ssh"),
            sshpass_program: PathBuf::from("sshpass"),
        }
    }
}

impl OpenSshTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ssh_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.ssh_program = program.into();
        self
    }

    pub fn with_sshpass_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.sshpass_program = program.into();
        self
    }

    fn master_command(&self, auth: &AuthMethod, key_file: Option<&Path>) -> Command {
        if let Some(key) = key_file {
            let mut cmd = Command::new(&self.ssh_program);
            cmd.arg("-i")
                .arg(key)
                .args(["-o", "IdentitiesOnly=yes", "-o", "BatchMode=yes"]);
            return cmd;
        }
        match auth {
            AuthMethod::Password(password) => {
                let mut cmd = Command::new(&self.sshpass_program);
                cmd.arg("-e")
                    .arg(&self.ssh_program)
                    .env("SSHPASS", password)
                    .args([
                        "-o",
                        "PubkeyAuthentication=no",
                        "-o",
                        "PreferredAuthentications=password,keyboard-interactive",
                    ]);
                cmd
            }
            AuthMethod::PrivateKey(_) => Command::new(&self.ssh_program),
        }
    }
}

#[async_trait]
impl Transport for OpenSshTransport {
    type Connection = OpenSshConnection;

    async fn dial(
        &self,
        target: &Target,
        auth: &AuthMethod,
        timeout: Duration,
    ) -> Result<OpenSshConnection, SshError> {
        let control_dir = tempfile::Builder::new().prefix("forge-ssh-").tempdir()?;
        let control_path = control_dir.path().join("master.sock");
        let log_path = control_dir.path().join("master.log");

        let key_file = match auth {
            AuthMethod::PrivateKey(key) => Some(write_key_file(key)?),
            AuthMethod::Password(_) => None,
        };

        let mut cmd = self.master_command(auth, key_file.as_ref().map(|f| f.path()));
        cmd.arg("-M")
            .arg("-S")
            .arg(&control_path)
            .arg("-E")
            .arg(&log_path)
            .args(["-o", "ControlPersist=yes", "-N", "-f"])
            .arg("-o")
            .arg(format!("ConnectTimeout={}", timeout.as_secs().max(1)))
            .args(common_args(target))
            .arg(&target.host)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        tracing::debug!(address = %target.address(), auth = auth.kind(), "starting control master");
        let status = tokio::time::timeout(timeout + DIAL_GRACE, cmd.status())
            .await
            .map_err(|_| SshError::DialTimeout(timeout))??;

        if !status.success() {
            let log = std::fs::read_to_string(&log_path).unwrap_or_default();
            let detail = log.trim();
            return Err(SshError::Transport(if detail.is_empty() {
                format!("ssh to {} failed with {}", target.address(), status)
            } else {
                detail.to_string()
            }));
        }

        Ok(OpenSshConnection {
            inner: Arc::new(ControlMaster {
                ssh_program: self.ssh_program.clone(),
                target: target.clone(),
                control_path,
                closed: AtomicBool::new(false),
                _control_dir: control_dir,
                _key_file: key_file,
            }),
        })
    }
}

struct ControlMaster {
    ssh_program: PathBuf,
    target: Target,
    control_path: PathBuf,
    closed: AtomicBool,
    _control_dir: TempDir,
    _key_file: Option<NamedTempFile>,
}

impl ControlMaster {
    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.ssh_program);
        cmd.arg("-S").arg(&self.control_path);
        cmd.args(common_args(&self.target));
        cmd
    }

    /// A `true` session over the master, so the server sees traffic and answers
    fn keepalive_command(&self) -> Command {
        let mut cmd = self.command();
        cmd.arg(&self.target.host)
            .args(["--", "true"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn exit_command(&self) -> std::process::Command {
        let mut cmd = std::process::Command::new(&self.ssh_program);
        cmd.arg("-S")
            .arg(&self.control_path)
            .args(common_args(&self.target))
            .args(["-O", "exit"])
            .arg(&self.target.host)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        cmd
    }

    async fn keepalive(&self) -> Result<(), SshError> {
        let output = self.keepalive_command().output().await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(SshError::Transport(format!(
                "keepalive failed with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }

    async fn control(&self, op: &str) -> Result<(), SshError> {
        let output = self
            .command()
            .args(["-O", op])
            .arg(&self.target.host)
            .stdin(Stdio::null())
            .output()
            .await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(SshError::Transport(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ))
        }
    }
}

impl Drop for ControlMaster {
    fn drop(&mut self) {
        // the master is detached (-f) and would outlive its socket directory
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        if let Err(e) = self.exit_command().status() {
            tracing::warn!(error = %e, "failed to stop control master");
        }
    }
}

pub struct OpenSshConnection {
    inner: Arc<ControlMaster>,
}

#[async_trait]
impl Connection for OpenSshConnection {
    type Channel = OpenSshChannel;

    async fn open_channel(&self) -> Result<OpenSshChannel, SshError> {
        Ok(OpenSshChannel {
            master: Arc::clone(&self.inner),
            pty: None,
        })
    }

    async fn keepalive(&self) -> Result<(), SshError> {
        self.inner.keepalive().await
    }

    async fn close(&self) -> Result<(), SshError> {
        self.inner.control("exit").await?;
        self.inner.closed.store(true, Ordering::Release);
        Ok(())
    }
}

pub struct OpenSshChannel {
    master: Arc<ControlMaster>,
    pty: Option<PtyRequest>,
}

#[async_trait]
impl Channel for OpenSshChannel {
    async fn request_pty(&mut self, pty: &PtyRequest) -> Result<(), SshError> {
        self.pty = Some(pty.clone());
        Ok(())
    }

    async fn exec(&mut self, command: &str, io: ExecIo<'_>) -> Result<u32, SshError> {
        let mut cmd = self.master.command();
        if self.pty.is_some() {
            cmd.arg("-tt");
        }
        cmd.arg(&self.master.target.host)
            .arg("--")
            .arg(remote_command(command, self.pty.as_ref()))
            .stdin(if io.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;
        let child_stdin = child.stdin.take();
        let child_stdout = child.stdout.take();
        let child_stderr = child.stderr.take();
        let ExecIo {
            stdin,
            mut stdout,
            mut stderr,
        } = io;

        let feed = async {
            if let (Some(mut src), Some(mut dst)) = (stdin, child_stdin) {
                match tokio::io::copy(&mut src, &mut dst).await {
                    Ok(_) => dst.shutdown().await,
                    // remote side finished without draining its input
                    Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
                    Err(e) => Err(e),
                }
            } else {
                Ok(())
            }
        };
        let out = async {
            let result = match child_stdout {
                Some(mut src) => tokio::io::copy(&mut src, &mut stdout).await.map(|_| ()),
                None => Ok(()),
            };
            let result = match result {
                Ok(()) => stdout.flush().await,
                Err(e) => Err(e),
            };
            if result.is_err() {
                // nobody is reading any more; stop the remote command
                let _ = child.start_kill();
            }
            result
        };
        let err = async {
            match child_stderr {
                Some(mut src) => {
                    tokio::io::copy(&mut src, &mut stderr).await?;
                    stderr.flush().await
                }
                None => Ok(()),
            }
        };

        let (fed, copied_out, copied_err) = tokio::join!(feed, out, err);
        let status = child.wait().await?;
        fed?;
        copied_out?;
        copied_err?;

        status
            .code()
            .map(|code| code as u32)
            .ok_or_else(|| SshError::Transport(format!("remote command ended by {}", status)))
    }
}

/// Options shared by every `ssh` invocation against `target`
fn common_args(target: &Target) -> Vec<String> {
    vec![
        "-p".into(),
        target.port.to_string(),
        "-l".into(),
        target.username.clone(),
        "-o".into(),
        "StrictHostKeyChecking=no".into(),
        "-o".into(),
        "UserKnownHostsFile=/dev/null".into(),
        "-o".into(),
        "LogLevel=ERROR".into(),
    ]
}

/// The command line handed to the remote shell
fn remote_command(command: &str, pty: Option<&PtyRequest>) -> String {
    match pty {
        Some(pty) => format!(
            "export TERM={}; stty {} 2>/dev/null; {}",
            crate::scp::shell_quote(&pty.term),
            pty.stty_args(),
            command
        ),
        None => command.to_string(),
    }
}

fn write_key_file(key: &str) -> Result<NamedTempFile, SshError> {
    // NamedTempFile is created owner-only, as ssh requires for identities
    let mut file = tempfile::Builder::new().prefix("forge-key-").tempfile()?;
    file.write_all(key.as_bytes())?;
    if !key.ends_with('\n') {
        file.write_all(b"\n")?;
    }
    file.flush()?;
    Ok(file)
}
