// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event filtering for execution units

use forge_core::labels::SHELL_PROVISIONER_NAME;
use forge_core::Job;

/// Decides which job change events are worth reconciling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFilter {
    namespace: String,
}

impl JobFilter {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// True for units this provisioner owns that have reported a condition
    pub fn matches(&self, job: &Job) -> bool {
        job.managed_by() == Some(SHELL_PROVISIONER_NAME)
            && job.namespace == self.namespace
            && !job.status.conditions.is_empty()
            && job.has_build_name()
            && job.has_provisioner_id()
    }
}
