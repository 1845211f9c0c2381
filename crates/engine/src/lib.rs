// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! forge-engine: execution unit orchestration for the shell provisioner
//!
//! The orchestrator creates one execution unit per provisioner run; the
//! watcher resolves finished units into outcomes and removes them; the
//! controller drives the watcher from a keyed work queue.

mod config;
mod controller;
mod error;
pub mod job_builder;
mod orchestrator;
mod predicates;
mod watcher;

pub use config::{ConfigError, ControllerConfig};
pub use controller::{Controller, Reconciler, Requeue};
pub use error::{OrchestrateError, WatchError};
pub use job_builder::{JobBuildError, ShellJobBuilder};
pub use orchestrator::{record_outcome, Ensured, ProvisionerJobOrchestrator};
pub use predicates::JobFilter;
pub use watcher::{JobStatusWatcher, WatchOutcome};
