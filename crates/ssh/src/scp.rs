// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-file remote copy protocol
//!
//! The sink side (`scp -t <dir>`) reads one header line, `C<mode> <len> <name>\n`,
//! followed by exactly `len` content bytes and a NUL terminator. The source side
//! (`scp -f <path>`) waits for a NUL acknowledgement before each message it sends.

use crate::error::SshError;

/// Remote copy program invoked on the far end
pub const SCP_PROGRAM: &str = "/usr/bin/scp";

/// Acknowledgement byte of the copy protocol
pub const ACK: u8 = 0;

/// Acks a source needs to stream one file: before the header, before the
/// content, and after the trailing NUL
pub const ACKS_PER_FILE: usize = 3;

/// Longest header line accepted from a remote source
pub const MAX_HEADER_LEN: u64 = 4096;

/// Parsed `C<mode> <len> <name>` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyHeader {
    pub mode: u32,
    pub length: u64,
    pub name: String,
}

/// Header announcing an upload of `length` bytes named `name`
pub fn upload_header(mode: u32, length: u64, name: &str) -> String {
    format!("C{:04o} {} {}\n", mode & 0o7777, length, name)
}

/// Parse a header line received from a remote source.
///
/// The line must end in `\n` and hold exactly three space separated fields,
/// the first being `C` plus four octal digits. Anything else is an
/// [`SshError::InvalidMessageLength`].
pub fn parse_header(line: &[u8]) -> Result<CopyHeader, SshError> {
    let line = std::str::from_utf8(line).map_err(|_| SshError::InvalidMessageLength)?;
    let line = line
        .strip_suffix('\n')
        .ok_or(SshError::InvalidMessageLength)?;

    let fields: Vec<&str> = line.split(' ').collect();
    let [mode, length, name] = fields.as_slice() else {
        return Err(SshError::InvalidMessageLength);
    };

    let mode = match mode.strip_prefix('C') {
        Some(digits) if mode.len() == 5 => {
            u32::from_str_radix(digits, 8).map_err(|_| SshError::InvalidMessageLength)?
        }
        _ => return Err(SshError::InvalidMessageLength),
    };
    let length = length
        .parse::<u64>()
        .map_err(|_| SshError::InvalidMessageLength)?;

    Ok(CopyHeader {
        mode,
        length,
        name: (*name).to_string(),
    })
}

/// Split a remote destination into its directory and base name
pub fn split_remote_path(path: &str) -> (String, String) {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return if path.is_empty() {
            (".".into(), ".".into())
        } else {
            ("/".into(), "/".into())
        };
    }
    match trimmed.rsplit_once('/') {
        Some(("", base)) => ("/".into(), base.into()),
        Some((dir, base)) => (dir.into(), base.into()),
        None => (".".into(), trimmed.into()),
    }
}

/// Command starting a copy sink that writes into `dir`
pub fn sink_command(dir: &str) -> String {
    format!("{} -t {}", SCP_PROGRAM, shell_quote(dir))
}

/// Command starting a copy source that streams `path`
pub fn source_command(path: &str) -> String {
    format!("{} -f {}", SCP_PROGRAM, shell_quote(path))
}

/// Quote `s` for a POSIX shell, leaving plain words alone
pub fn shell_quote(s: &str) -> String {
    fn is_plain(c: char) -> bool {
        c.is_ascii_alphanumeric()
            || matches!(c, '/' | '.' | '_' | '-' | '+' | ':' | '@' | '%' | ',' | '=')
    }

    if !s.is_empty() && s.chars().all(is_plain) {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
#[path = "scp_tests.rs"]
mod tests;
