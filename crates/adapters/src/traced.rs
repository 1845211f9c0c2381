// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::outcome::{OutcomeError, OutcomeSink};
use crate::store::{ApplyResult, ClusterStore, Propagation, StoreError};
use async_trait::async_trait;
use forge_core::{ContainerFailure, CorrelationKey, Job, LabelSelector, ObjectKey, ProcessGroup};
use std::time::Instant;
use tracing::Instrument;

/// Wrapper that adds tracing to any ClusterStore
#[derive(Clone)]
pub struct TracedClusterStore<S> {
    inner: S,
}

impl<S> TracedClusterStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: ClusterStore> ClusterStore for TracedClusterStore<S> {
    async fn apply_job(&self, job: &Job) -> Result<ApplyResult, StoreError> {
        let span = tracing::info_span!("store.apply_job", job = %job.key());
        async {
            let start = Instant::now();
            let result = self.inner.apply_job(job).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(applied) => tracing::info!(?applied, elapsed_ms, "applied"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "apply failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn get_job(&self, key: &ObjectKey) -> Result<Job, StoreError> {
        let result = self.inner.get_job(key).await;
        match &result {
            Ok(job) => tracing::trace!(
                job = %key,
                conditions = job.status.conditions.len(),
                "fetched"
            ),
            // not found is an ordinary answer for a job that was cleaned up
            Err(e) if e.is_not_found() => tracing::debug!(job = %key, "job not found"),
            Err(e) => tracing::error!(job = %key, error = %e, "get failed"),
        }
        result
    }

    async fn delete_job(&self, key: &ObjectKey, propagation: Propagation) -> Result<(), StoreError> {
        let span = tracing::info_span!("store.delete_job", job = %key, ?propagation);
        async {
            let start = Instant::now();
            let result = self.inner.delete_job(key, propagation).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(()) => tracing::info!(elapsed_ms, "deleted"),
                Err(e) if e.is_not_found() => tracing::debug!(elapsed_ms, "already gone"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "delete failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn list_process_groups(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<ProcessGroup>, StoreError> {
        let span = tracing::info_span!("store.list_process_groups", namespace, %selector);
        async {
            let result = self.inner.list_process_groups(namespace, selector).await;
            match &result {
                Ok(groups) => tracing::debug!(count = groups.len(), "listed"),
                Err(e) => tracing::error!(error = %e, "list failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

/// Wrapper that adds tracing to any OutcomeSink
#[derive(Clone)]
pub struct TracedOutcomeSink<O> {
    inner: O,
}

impl<O> TracedOutcomeSink<O> {
    pub fn new(inner: O) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<O: OutcomeSink> OutcomeSink for TracedOutcomeSink<O> {
    async fn job_succeeded(&self, key: &CorrelationKey) -> Result<(), OutcomeError> {
        tracing::info!(build = %key.build, provisioner_id = %key.provisioner_id, "provisioner run succeeded");
        let result = self.inner.job_succeeded(key).await;
        if let Err(e) = &result {
            tracing::error!(error = %e, "recording success failed");
        }
        result
    }

    async fn container_failed(
        &self,
        key: &CorrelationKey,
        failure: &ContainerFailure,
    ) -> Result<(), OutcomeError> {
        tracing::error!(
            build = %key.build,
            provisioner_id = %key.provisioner_id,
            container = %failure.container,
            exit_code = failure.exit_code,
            reason = %failure.reason,
            message = %failure.message,
            "provisioner container failed"
        );
        let result = self.inner.container_failed(key, failure).await;
        if let Err(e) = &result {
            tracing::error!(error = %e, "recording container failure failed");
        }
        result
    }

    async fn job_failed(&self, key: &CorrelationKey) -> Result<(), OutcomeError> {
        tracing::warn!(build = %key.build, provisioner_id = %key.provisioner_id, "provisioner run failed");
        let result = self.inner.job_failed(key).await;
        if let Err(e) = &result {
            tracing::error!(error = %e, "recording failure failed");
        }
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
