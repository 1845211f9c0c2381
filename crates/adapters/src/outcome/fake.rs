// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake outcome sink for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{OutcomeError, OutcomeSink};
use async_trait::async_trait;
use forge_core::{ContainerFailure, CorrelationKey};
use std::sync::{Arc, Mutex};

/// Recorded outcome call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeCall {
    Succeeded {
        key: CorrelationKey,
    },
    ContainerFailed {
        key: CorrelationKey,
        failure: ContainerFailure,
    },
    Failed {
        key: CorrelationKey,
    },
}

/// Fake outcome sink for testing
#[derive(Clone, Default)]
pub struct FakeOutcomeSink {
    calls: Arc<Mutex<Vec<OutcomeCall>>>,
    rejecting: Arc<Mutex<bool>>,
}

impl FakeOutcomeSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<OutcomeCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Container failures recorded so far
    pub fn failures(&self) -> Vec<ContainerFailure> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                OutcomeCall::ContainerFailed { failure, .. } => Some(failure),
                _ => None,
            })
            .collect()
    }

    /// Make every later call fail
    pub fn reject_all(&self) {
        *self.rejecting.lock().unwrap_or_else(|e| e.into_inner()) = true;
    }

    fn record(&self, call: OutcomeCall) -> Result<(), OutcomeError> {
        if *self.rejecting.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(OutcomeError::Rejected("sink unavailable".into()));
        }
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
        Ok(())
    }
}

#[async_trait]
impl OutcomeSink for FakeOutcomeSink {
    async fn job_succeeded(&self, key: &CorrelationKey) -> Result<(), OutcomeError> {
        self.record(OutcomeCall::Succeeded { key: key.clone() })
    }

    async fn container_failed(
        &self,
        key: &CorrelationKey,
        failure: &ContainerFailure,
    ) -> Result<(), OutcomeError> {
        self.record(OutcomeCall::ContainerFailed {
            key: key.clone(),
            failure: failure.clone(),
        })
    }

    async fn job_failed(&self, key: &CorrelationKey) -> Result<(), OutcomeError> {
        self.record(OutcomeCall::Failed { key: key.clone() })
    }
}
