// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolved results of execution units

use serde::{Deserialize, Serialize};
use std::fmt;

/// One container that terminated with a non-zero exit code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerFailure {
    pub container: String,
    pub exit_code: i32,
    pub reason: String,
    pub message: String,
}

impl fmt::Display for ContainerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "container {} exited with code {} (reason: {}, message: {})",
            self.container, self.exit_code, self.reason, self.message
        )
    }
}

/// Terminal result of one provisioner run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobOutcome {
    Succeeded,
    Failed { failures: Vec<ContainerFailure> },
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded)
    }
}
