// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution units: one scheduled cluster job per provisioner run

use crate::labels::{
    CorrelationKey, Labels, BATCH_CONTROLLER_UID_LABEL, BUILD_NAME_LABEL, CONTROLLER_UID_LABEL,
    MANAGED_BY_LABEL, PROVISIONER_ID_LABEL,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Namespaced object name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Label equality selector
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    #[serde(default)]
    pub match_labels: Labels,
}

impl LabelSelector {
    pub fn single(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut match_labels = Labels::new();
        match_labels.insert(key.into(), value.into());
        Self { match_labels }
    }

    pub fn matches(&self, labels: &Labels) -> bool {
        self.match_labels
            .iter()
            .all(|(k, v)| labels.get(k) == Some(v))
    }

    /// Selector over the scheduler's controller-uid label.
    ///
    /// Looks up the legacy key first and falls back to the prefixed key used
    /// by newer platforms. Returns `None` when neither carries a value.
    pub fn controller_uid(&self) -> Option<LabelSelector> {
        [CONTROLLER_UID_LABEL, BATCH_CONTROLLER_UID_LABEL]
            .into_iter()
            .find_map(|key| {
                self.match_labels
                    .get(key)
                    .filter(|v| !v.is_empty())
                    .map(|v| LabelSelector::single(key, v.clone()))
            })
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .match_labels
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        f.write_str(&parts.join(","))
    }
}

/// Source of an environment variable inside the execution unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EnvSource {
    Value(String),
    SecretKey {
        secret: String,
        key: String,
        optional: bool,
    },
    ConfigMapKey {
        config_map: String,
        key: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub source: EnvSource,
}

impl EnvVar {
    pub fn value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: EnvSource::Value(value.into()),
        }
    }
}

/// Desired shape of an execution unit
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSpec {
    pub image: String,
    #[serde(default)]
    pub env: Vec<EnvVar>,
    #[serde(default)]
    pub args: Vec<String>,
    /// Pod retries the scheduler performs itself before marking the job failed
    #[serde(default)]
    pub backoff_limit: u32,
    /// Assigned by the cluster once the job is created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<LabelSelector>,
}

/// Type of a job status condition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobConditionType {
    Complete,
    Failed,
    Suspended,
    FailureTarget,
    SuccessCriteriaMet,
    Other(String),
}

impl From<String> for JobConditionType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Complete" => JobConditionType::Complete,
            "Failed" => JobConditionType::Failed,
            "Suspended" => JobConditionType::Suspended,
            "FailureTarget" => JobConditionType::FailureTarget,
            "SuccessCriteriaMet" => JobConditionType::SuccessCriteriaMet,
            _ => JobConditionType::Other(s),
        }
    }
}

impl From<JobConditionType> for String {
    fn from(t: JobConditionType) -> Self {
        t.to_string()
    }
}

impl fmt::Display for JobConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobConditionType::Complete => f.write_str("Complete"),
            JobConditionType::Failed => f.write_str("Failed"),
            JobConditionType::Suspended => f.write_str("Suspended"),
            JobConditionType::FailureTarget => f.write_str("FailureTarget"),
            JobConditionType::SuccessCriteriaMet => f.write_str("SuccessCriteriaMet"),
            JobConditionType::Other(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCondition {
    #[serde(rename = "type")]
    pub kind: JobConditionType,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,
}

impl JobCondition {
    pub fn new(kind: JobConditionType) -> Self {
        Self {
            kind,
            reason: String::new(),
            message: String::new(),
            last_transition_time: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JobStatus {
    #[serde(default)]
    pub conditions: Vec<JobCondition>,
}

/// A scheduled execution unit
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Job {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub annotations: Labels,
    pub spec: JobSpec,
    #[serde(default)]
    pub status: JobStatus,
}

impl Job {
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace.clone(), self.name.clone())
    }

    /// Ownership parsed from the labels
    pub fn correlation(&self) -> Option<CorrelationKey> {
        CorrelationKey::from_labels(&self.labels)
    }

    pub fn managed_by(&self) -> Option<&str> {
        self.labels.get(MANAGED_BY_LABEL).map(String::as_str)
    }

    pub fn has_label(&self, key: &str) -> bool {
        self.labels.get(key).is_some_and(|v| !v.is_empty())
    }

    pub fn has_build_name(&self) -> bool {
        self.has_label(BUILD_NAME_LABEL)
    }

    pub fn has_provisioner_id(&self) -> bool {
        self.has_label(PROVISIONER_ID_LABEL)
    }

    /// The first reported condition, which decides the outcome
    pub fn first_condition(&self) -> Option<&JobCondition> {
        self.status.conditions.first()
    }

    pub fn with_condition(mut self, kind: JobConditionType) -> Self {
        self.status.conditions.push(JobCondition::new(kind));
        self
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
