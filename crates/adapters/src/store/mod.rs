// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster object store adapters

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeClusterStore, StoreCall, StoreOp};

use async_trait::async_trait;
use forge_core::{Job, LabelSelector, ObjectKey, ProcessGroup};
use thiserror::Error;

/// Errors from store operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// What a create-or-update did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyResult {
    Created,
    Updated,
    Unchanged,
}

/// How dependents of a deleted object are cleaned up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Propagation {
    /// Delete the owner now, dependents asynchronously
    #[default]
    Background,
    Foreground,
    Orphan,
}

/// Adapter for the cluster object store holding jobs and their pods
#[async_trait]
pub trait ClusterStore: Clone + Send + Sync + 'static {
    /// Create the job if absent, update it if it differs, else leave it alone
    async fn apply_job(&self, job: &Job) -> Result<ApplyResult, StoreError>;

    async fn get_job(&self, key: &ObjectKey) -> Result<Job, StoreError>;

    async fn delete_job(&self, key: &ObjectKey, propagation: Propagation)
        -> Result<(), StoreError>;

    /// Process groups in `namespace` whose labels satisfy `selector`
    async fn list_process_groups(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<ProcessGroup>, StoreError>;
}
