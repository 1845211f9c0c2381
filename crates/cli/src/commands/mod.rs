// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subcommand implementations

pub mod download;
pub mod run;
pub mod upload;

use forge_ssh::SshError;

/// Exit code of a failed remote command, or the original error
pub(crate) fn remote_exit(result: Result<(), SshError>) -> Result<u32, SshError> {
    match result {
        Ok(()) => Ok(0),
        Err(SshError::ExitStatus(code)) => Ok(code),
        Err(e) => Err(e),
    }
}

/// Parse an octal permission string such as `644` or `0755`
pub(crate) fn parse_mode(s: &str) -> Result<u32, String> {
    let mode = u32::from_str_radix(s, 8).map_err(|_| format!("invalid octal mode: {}", s))?;
    if mode > 0o7777 {
        return Err(format!("mode out of range: {}", s));
    }
    Ok(mode)
}
