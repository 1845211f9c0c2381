// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outcome sinks: where resolved provisioner runs are reported

mod noop;

pub use noop::NoOpOutcomeSink;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeOutcomeSink, OutcomeCall};

use async_trait::async_trait;
use forge_core::{ContainerFailure, CorrelationKey};
use thiserror::Error;

/// Errors from outcome sinks
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutcomeError {
    #[error("outcome rejected: {0}")]
    Rejected(String),
}

/// Receives terminal results of execution units
///
/// Delivery is at-least-once. Records are sent before the unit is deleted,
/// so a failed delete makes the next reconcile report the same run again.
/// Implementations keyed on `CorrelationKey` should treat repeats as no-ops.
#[async_trait]
pub trait OutcomeSink: Clone + Send + Sync + 'static {
    async fn job_succeeded(&self, key: &CorrelationKey) -> Result<(), OutcomeError>;

    /// One call per container that exited non-zero
    async fn container_failed(
        &self,
        key: &CorrelationKey,
        failure: &ContainerFailure,
    ) -> Result<(), OutcomeError>;

    /// Counts a failed unit, after its container failures
    async fn job_failed(&self, key: &CorrelationKey) -> Result<(), OutcomeError>;
}
