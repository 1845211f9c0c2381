// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op outcome sink for when nothing consumes outcomes.

use super::{OutcomeError, OutcomeSink};
use async_trait::async_trait;
use forge_core::{ContainerFailure, CorrelationKey};

/// Outcome sink that drops everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpOutcomeSink;

impl NoOpOutcomeSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OutcomeSink for NoOpOutcomeSink {
    async fn job_succeeded(&self, _key: &CorrelationKey) -> Result<(), OutcomeError> {
        Ok(())
    }

    async fn container_failed(
        &self,
        _key: &CorrelationKey,
        _failure: &ContainerFailure,
    ) -> Result<(), OutcomeError> {
        Ok(())
    }

    async fn job_failed(&self, _key: &CorrelationKey) -> Result<(), OutcomeError> {
        Ok(())
    }
}
