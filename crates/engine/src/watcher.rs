// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolves finished execution units into provisioner outcomes

use crate::config::ControllerConfig;
use crate::controller::{Reconciler, Requeue};
use crate::error::WatchError;
use crate::predicates::JobFilter;
use async_trait::async_trait;
use forge_adapters::{ClusterStore, OutcomeSink, Propagation};
use forge_core::{
    ContainerFailure, CorrelationKey, Job, JobConditionType, JobOutcome, ObjectKey,
};

/// Result of reconciling one execution unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The unit no longer exists
    Gone,
    /// The unit has not reported a condition yet
    Pending,
    Succeeded {
        key: CorrelationKey,
    },
    Failed {
        key: CorrelationKey,
        failures: Vec<ContainerFailure>,
    },
}

impl WatchOutcome {
    /// Owning run and its resolved outcome, for terminal results
    pub fn resolved(&self) -> Option<(&CorrelationKey, JobOutcome)> {
        match self {
            WatchOutcome::Succeeded { key } => Some((key, JobOutcome::Succeeded)),
            WatchOutcome::Failed { key, failures } => Some((
                key,
                JobOutcome::Failed {
                    failures: failures.clone(),
                },
            )),
            WatchOutcome::Gone | WatchOutcome::Pending => None,
        }
    }
}

pub struct JobStatusWatcher<S, O> {
    store: S,
    sink: O,
    namespace: String,
    filter: JobFilter,
}

impl<S: ClusterStore, O: OutcomeSink> JobStatusWatcher<S, O> {
    pub fn new(store: S, sink: O, config: &ControllerConfig) -> Self {
        Self {
            store,
            sink,
            namespace: config.namespace.clone(),
            filter: JobFilter::new(config.namespace.clone()),
        }
    }

    /// Key to enqueue for a job change event, if the event qualifies
    pub fn admit(&self, job: &Job) -> Option<ObjectKey> {
        self.filter.matches(job).then(|| job.key())
    }

    pub async fn reconcile_job(&self, key: &ObjectKey) -> Result<WatchOutcome, WatchError> {
        let job = match self.store.get_job(key).await {
            Ok(job) => job,
            Err(e) if e.is_not_found() => return Ok(WatchOutcome::Gone),
            Err(e) => return Err(e.into()),
        };
        let Some(condition) = job.first_condition() else {
            return Ok(WatchOutcome::Pending);
        };

        match &condition.kind {
            JobConditionType::Complete => {
                let owner = correlation(&job)?;
                self.sink.job_succeeded(&owner).await?;
                self.delete(key).await?;
                Ok(WatchOutcome::Succeeded { key: owner })
            }
            JobConditionType::Failed => {
                let owner = correlation(&job)?;
                let failures = self.container_failures(key).await?;
                for failure in &failures {
                    self.sink.container_failed(&owner, failure).await?;
                }
                self.sink.job_failed(&owner).await?;
                self.delete(key).await?;
                Ok(WatchOutcome::Failed {
                    key: owner,
                    failures,
                })
            }
            other => {
                tracing::error!(job = %key, condition = %other, "unrecognized job condition");
                Err(WatchError::UnrecognizedCondition(other.clone()))
            }
        }
    }

    /// Non-zero container exits across every process group of the unit.
    ///
    /// Re-reads the unit for its cluster-assigned selector. A unit that has
    /// vanished or never got a selector yields no failures.
    async fn container_failures(&self, key: &ObjectKey) -> Result<Vec<ContainerFailure>, WatchError> {
        let job = match self.store.get_job(key).await {
            Ok(job) => job,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let Some(selector) = job.spec.selector.as_ref().and_then(|s| s.controller_uid()) else {
            tracing::debug!(job = %key, "no controller selector, skipping container lookup");
            return Ok(Vec::new());
        };
        let groups = self
            .store
            .list_process_groups(&self.namespace, &selector)
            .await?;
        Ok(groups.iter().flat_map(|g| g.failures()).collect())
    }

    async fn delete(&self, key: &ObjectKey) -> Result<(), WatchError> {
        match self.store.delete_job(key, Propagation::Background).await {
            Err(e) if !e.is_not_found() => Err(e.into()),
            _ => Ok(()),
        }
    }
}

fn correlation(job: &Job) -> Result<CorrelationKey, WatchError> {
    job.correlation()
        .ok_or_else(|| WatchError::MissingCorrelation(job.key()))
}

#[async_trait]
impl<S: ClusterStore, O: OutcomeSink> Reconciler for JobStatusWatcher<S, O> {
    type Error = WatchError;

    async fn reconcile(&self, key: &ObjectKey) -> Result<Requeue, WatchError> {
        let outcome = self.reconcile_job(key).await?;
        tracing::debug!(job = %key, ?outcome, "reconciled");
        Ok(Requeue::Done)
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
