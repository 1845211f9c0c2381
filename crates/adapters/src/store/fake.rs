// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake cluster store for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ApplyResult, ClusterStore, Propagation, StoreError};
use async_trait::async_trait;
use forge_core::labels::BATCH_CONTROLLER_UID_LABEL;
use forge_core::{Job, LabelSelector, ObjectKey, ProcessGroup};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

/// Store operation, for injecting failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Apply,
    Get,
    Delete,
    List,
}

/// Recorded store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Apply {
        key: ObjectKey,
        result: Option<ApplyResult>,
    },
    Get {
        key: ObjectKey,
    },
    Delete {
        key: ObjectKey,
        propagation: Propagation,
    },
    List {
        namespace: String,
        selector: String,
    },
}

#[derive(Default)]
struct FakeCluster {
    jobs: BTreeMap<ObjectKey, Job>,
    pods: Vec<ProcessGroup>,
    failures: HashMap<StoreOp, Vec<StoreError>>,
    calls: Vec<StoreCall>,
    next_uid: u64,
}

impl FakeCluster {
    fn take_failure(&mut self, op: StoreOp) -> Option<StoreError> {
        let queued = self.failures.get_mut(&op)?;
        if queued.is_empty() {
            None
        } else {
            Some(queued.remove(0))
        }
    }
}

/// Fake cluster store for testing
///
/// Newly created jobs get a controller-uid selector, as a real cluster would.
#[derive(Clone, Default)]
pub struct FakeClusterStore {
    cluster: Arc<Mutex<FakeCluster>>,
}

impl FakeClusterStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn cluster(&self) -> MutexGuard<'_, FakeCluster> {
        self.cluster.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<StoreCall> {
        self.cluster().calls.clone()
    }

    pub fn job(&self, key: &ObjectKey) -> Option<Job> {
        self.cluster().jobs.get(key).cloned()
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.cluster().jobs.values().cloned().collect()
    }

    /// Insert or replace a job as-is, without recording a call
    pub fn put_job(&self, job: Job) {
        self.cluster().jobs.insert(job.key(), job);
    }

    pub fn add_process_group(&self, group: ProcessGroup) {
        self.cluster().pods.push(group);
    }

    pub fn process_groups(&self) -> Vec<ProcessGroup> {
        self.cluster().pods.clone()
    }

    /// Fail the next call of `op` with `error`; queued failures are used in order
    pub fn fail_next(&self, op: StoreOp, error: StoreError) {
        self.cluster().failures.entry(op).or_default().push(error);
    }

    pub fn delete_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, StoreCall::Delete { .. }))
            .count()
    }
}

/// Fields a create-or-update compares; cluster-owned fields are ignored
fn same_desired_state(existing: &Job, desired: &Job) -> bool {
    let mut desired_spec = desired.spec.clone();
    desired_spec.selector = existing.spec.selector.clone();
    existing.labels == desired.labels
        && existing.annotations == desired.annotations
        && existing.spec == desired_spec
}

#[async_trait]
impl ClusterStore for FakeClusterStore {
    async fn apply_job(&self, job: &Job) -> Result<ApplyResult, StoreError> {
        let mut guard = self.cluster();
        let cluster = &mut *guard;
        let key = job.key();
        if let Some(e) = cluster.take_failure(StoreOp::Apply) {
            cluster.calls.push(StoreCall::Apply { key, result: None });
            return Err(e);
        }

        let result = match cluster.jobs.get_mut(&key) {
            Some(existing) if same_desired_state(existing, job) => ApplyResult::Unchanged,
            Some(existing) => {
                let selector = existing.spec.selector.take();
                existing.labels = job.labels.clone();
                existing.annotations = job.annotations.clone();
                existing.spec = job.spec.clone();
                existing.spec.selector = selector;
                ApplyResult::Updated
            }
            None => {
                cluster.next_uid += 1;
                let mut created = job.clone();
                if created.spec.selector.is_none() {
                    let uid = format!("uid-{}", cluster.next_uid);
                    created.spec.selector =
                        Some(LabelSelector::single(BATCH_CONTROLLER_UID_LABEL, uid));
                }
                cluster.jobs.insert(key.clone(), created);
                ApplyResult::Created
            }
        };
        cluster.calls.push(StoreCall::Apply {
            key,
            result: Some(result),
        });
        Ok(result)
    }

    async fn get_job(&self, key: &ObjectKey) -> Result<Job, StoreError> {
        let mut cluster = self.cluster();
        cluster.calls.push(StoreCall::Get { key: key.clone() });
        if let Some(e) = cluster.take_failure(StoreOp::Get) {
            return Err(e);
        }
        cluster
            .jobs
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("job {}", key)))
    }

    async fn delete_job(&self, key: &ObjectKey, propagation: Propagation) -> Result<(), StoreError> {
        let mut cluster = self.cluster();
        cluster.calls.push(StoreCall::Delete {
            key: key.clone(),
            propagation,
        });
        if let Some(e) = cluster.take_failure(StoreOp::Delete) {
            return Err(e);
        }

        let job = cluster
            .jobs
            .remove(key)
            .ok_or_else(|| StoreError::NotFound(format!("job {}", key)))?;
        if propagation != Propagation::Orphan {
            if let Some(selector) = job.spec.selector.as_ref().and_then(|s| s.controller_uid()) {
                cluster
                    .pods
                    .retain(|p| p.namespace != key.namespace || !selector.matches(&p.labels));
            }
        }
        Ok(())
    }

    async fn list_process_groups(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<ProcessGroup>, StoreError> {
        let mut cluster = self.cluster();
        cluster.calls.push(StoreCall::List {
            namespace: namespace.to_string(),
            selector: selector.to_string(),
        });
        if let Some(e) = cluster.take_failure(StoreOp::List) {
            return Err(e);
        }
        Ok(cluster
            .pods
            .iter()
            .filter(|p| p.namespace == namespace && selector.matches(&p.labels))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
