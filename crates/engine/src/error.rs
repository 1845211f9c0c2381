// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for orchestration and watching

use crate::job_builder::JobBuildError;
use forge_adapters::{OutcomeError, StoreError};
use forge_core::{JobConditionType, ObjectKey};
use thiserror::Error;

/// Errors from ensuring an execution unit exists
#[derive(Debug, Error)]
pub enum OrchestrateError {
    #[error("building execution unit: {0}")]
    Build(#[from] JobBuildError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors from reconciling an execution unit
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("outcome sink error: {0}")]
    Outcome(#[from] OutcomeError),
    #[error("unrecognized job condition type: {0}")]
    UnrecognizedCondition(JobConditionType),
    #[error("job {0} carries no build correlation labels")]
    MissingCorrelation(ObjectKey),
}
