// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for remote execution

use std::time::Duration;
use thiserror::Error;

/// Errors from connecting to, running on, or copying to/from a remote host
#[derive(Debug, Error)]
pub enum SshError {
    #[error("a valid username must be supplied")]
    InvalidUsername,
    #[error("invalid authorization method: missing password or key")]
    InvalidAuth,
    #[error("invalid message length")]
    InvalidMessageLength,
    #[error("timed out waiting for sshd to respond")]
    Timeout,
    #[error("dial timed out after {0:?}")]
    DialTimeout(Duration),
    #[error("not connected")]
    NotConnected,
    #[error("remote command exited with status {0}")]
    ExitStatus(u32),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SshError {
    /// Exit status of the remote command, if that is what failed
    pub fn exit_status(&self) -> Option<u32> {
        match self {
            SshError::ExitStatus(code) => Some(*code),
            _ => None,
        }
    }
}
