// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! forge-ssh: remote command execution and single-file copy over SSH

pub mod client;
pub mod credentials;
pub mod error;
pub mod scp;
pub mod transport;

pub use client::{ClientOptions, SshClient, RETRY_INTERVAL};
pub use credentials::{AuthMethod, Credentials};
pub use error::SshError;
pub use scp::CopyHeader;
pub use transport::{
    Channel, Connection, ExecIo, OpenSshTransport, PtyRequest, Target, TerminalMode, Transport,
    DEFAULT_PORT, DIAL_TIMEOUT,
};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use transport::{FakeCommand, FakeFile, FakeTransport, TransportCall};
