// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provisioner steps and their per-run state

use crate::id::CorrelationId;
use crate::outcome::JobOutcome;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Reason recorded when a unit failed but no container reported an exit
pub const JOB_FAILED_REASON: &str = "JobFailed";

/// Errors from constructing or decoding model objects
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("provisioner sets both run and runConfigMapRef; exactly one is allowed")]
    ConflictingScriptSource,
    #[error("provisioner sets neither run nor runConfigMapRef")]
    MissingScriptSource,
}

/// Which provisioner implementation handles a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProvisionerType {
    #[default]
    #[serde(rename = "built-in/shell")]
    BuiltinShell,
    #[serde(rename = "external")]
    External,
}

/// Lifecycle of one provisioner step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProvisionerStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Unknown,
}

impl fmt::Display for ProvisionerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProvisionerStatus::Pending => "Pending",
            ProvisionerStatus::Running => "Running",
            ProvisionerStatus::Completed => "Completed",
            ProvisionerStatus::Failed => "Failed",
            ProvisionerStatus::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// Key within a config map holding a script
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigMapKeyRef {
    pub name: String,
    pub key: String,
}

/// Where a provisioner's script comes from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScriptSource {
    Inline(String),
    ConfigMap(ConfigMapKeyRef),
}

impl ScriptSource {
    /// Combine the two optional wire fields, enforcing that exactly one is set
    pub fn from_parts(
        run: Option<String>,
        config_map: Option<ConfigMapKeyRef>,
    ) -> Result<Self, ModelError> {
        match (run, config_map) {
            (Some(_), Some(_)) => Err(ModelError::ConflictingScriptSource),
            (None, None) => Err(ModelError::MissingScriptSource),
            (Some(run), None) => Ok(ScriptSource::Inline(run)),
            (None, Some(r)) => Ok(ScriptSource::ConfigMap(r)),
        }
    }

    fn into_parts(self) -> (Option<String>, Option<ConfigMapKeyRef>) {
        match self {
            ScriptSource::Inline(run) => (Some(run), None),
            ScriptSource::ConfigMap(r) => (None, Some(r)),
        }
    }
}

/// One step in a build's ordered provisioner list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawProvisionerSpec", into = "RawProvisionerSpec")]
pub struct ProvisionerSpec {
    pub kind: ProvisionerType,
    pub script: ScriptSource,
    /// Correlation id of the current run, if one has been started
    pub uuid: Option<CorrelationId>,
    pub status: ProvisionerStatus,
    /// Runs left before a failure becomes terminal
    pub retries: u32,
    pub allow_fail: bool,
    pub failure_reason: Option<String>,
    pub failure_message: Option<String>,
}

impl ProvisionerSpec {
    pub fn new(kind: ProvisionerType, script: ScriptSource) -> Self {
        Self {
            kind,
            script,
            uuid: None,
            status: ProvisionerStatus::Pending,
            retries: 0,
            allow_fail: false,
            failure_reason: None,
            failure_message: None,
        }
    }

    pub fn shell_inline(script: impl Into<String>) -> Self {
        Self::new(
            ProvisionerType::BuiltinShell,
            ScriptSource::Inline(script.into()),
        )
    }

    pub fn shell_config_map(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(
            ProvisionerType::BuiltinShell,
            ScriptSource::ConfigMap(ConfigMapKeyRef {
                name: name.into(),
                key: key.into(),
            }),
        )
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_allow_fail(mut self, allow_fail: bool) -> Self {
        self.allow_fail = allow_fail;
        self
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            ProvisionerStatus::Completed | ProvisionerStatus::Failed
        )
    }

    /// Whether this step no longer blocks the build
    pub fn is_satisfied(&self) -> bool {
        match self.status {
            ProvisionerStatus::Completed => true,
            ProvisionerStatus::Failed => self.allow_fail,
            _ => false,
        }
    }

    /// Record that a new run was started under `id`
    pub fn assign_correlation_id(&mut self, id: CorrelationId) {
        self.uuid = Some(id);
        self.status = ProvisionerStatus::Running;
        self.failure_reason = None;
        self.failure_message = None;
    }

    /// Fold a resolved run outcome into this step.
    ///
    /// A failure with retries left clears the correlation id so the next
    /// reconcile starts a new run with a new execution unit.
    pub fn apply_outcome(&mut self, outcome: &JobOutcome) {
        match outcome {
            JobOutcome::Succeeded => {
                self.status = ProvisionerStatus::Completed;
                self.failure_reason = None;
                self.failure_message = None;
            }
            JobOutcome::Failed { .. } if self.retries > 0 => {
                self.retries -= 1;
                self.uuid = None;
                self.status = ProvisionerStatus::Pending;
                self.failure_reason = None;
                self.failure_message = None;
            }
            JobOutcome::Failed { failures } => {
                self.status = ProvisionerStatus::Failed;
                match failures.first() {
                    Some(first) => {
                        self.failure_reason = Some(first.reason.clone());
                        self.failure_message = Some(first.to_string());
                    }
                    None => {
                        self.failure_reason = Some(JOB_FAILED_REASON.to_string());
                        self.failure_message = Some(
                            "execution unit failed without a terminated container".to_string(),
                        );
                    }
                }
            }
        }
    }
}

/// Persisted form of [`ProvisionerSpec`]
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProvisionerSpec {
    #[serde(rename = "type", default)]
    kind: ProvisionerType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    run: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    run_config_map_ref: Option<ConfigMapKeyRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    uuid: Option<CorrelationId>,
    #[serde(default)]
    status: ProvisionerStatus,
    #[serde(default)]
    retries: u32,
    #[serde(default)]
    allow_fail: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failure_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failure_message: Option<String>,
}

impl TryFrom<RawProvisionerSpec> for ProvisionerSpec {
    type Error = ModelError;

    fn try_from(raw: RawProvisionerSpec) -> Result<Self, Self::Error> {
        Ok(Self {
            kind: raw.kind,
            script: ScriptSource::from_parts(raw.run, raw.run_config_map_ref)?,
            uuid: raw.uuid,
            status: raw.status,
            retries: raw.retries,
            allow_fail: raw.allow_fail,
            failure_reason: raw.failure_reason,
            failure_message: raw.failure_message,
        })
    }
}

impl From<ProvisionerSpec> for RawProvisionerSpec {
    fn from(spec: ProvisionerSpec) -> Self {
        let (run, run_config_map_ref) = spec.script.into_parts();
        Self {
            kind: spec.kind,
            run,
            run_config_map_ref,
            uuid: spec.uuid,
            status: spec.status,
            retries: spec.retries,
            allow_fail: spec.allow_fail,
            failure_reason: spec.failure_reason,
            failure_message: spec.failure_message,
        }
    }
}

#[cfg(test)]
#[path = "provisioner_tests.rs"]
mod tests;
