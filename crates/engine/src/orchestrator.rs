// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ensures one execution unit per provisioner run

use crate::config::ControllerConfig;
use crate::error::OrchestrateError;
use crate::job_builder::ShellJobBuilder;
use forge_adapters::ClusterStore;
use forge_core::{Build, CorrelationId, IdGen, JobOutcome, ProvisionerSpec, ProvisionerType};
use std::time::Duration;

/// What one `ensure` call did.
///
/// The orchestrator never writes to the build; the caller persists
/// `assigned` onto the provisioner it passed in. That write must land
/// before the next `ensure` for the same provisioner: a spec still
/// without an id gets a fresh id and a second unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ensured {
    /// Correlation id minted for a new run
    pub assigned: Option<CorrelationId>,
    pub requeue_after: Option<Duration>,
}

pub struct ProvisionerJobOrchestrator<S, I> {
    store: S,
    ids: I,
    config: ControllerConfig,
}

impl<S: ClusterStore, I: IdGen> ProvisionerJobOrchestrator<S, I> {
    pub fn new(store: S, ids: I, config: ControllerConfig) -> Self {
        Self { store, ids, config }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Create the execution unit for `spec` if its run has not started.
    ///
    /// A provisioner that already carries a correlation id is left alone,
    /// even if its unit no longer exists.
    pub async fn ensure(
        &self,
        build: &Build,
        spec: &ProvisionerSpec,
    ) -> Result<Ensured, OrchestrateError> {
        if spec.kind != ProvisionerType::BuiltinShell {
            tracing::debug!(build = %build.reference(), kind = ?spec.kind, "not a shell provisioner");
            return Ok(Ensured::default());
        }
        if let Some(id) = &spec.uuid {
            tracing::trace!(build = %build.reference(), provisioner_id = %id, "run already started");
            return Ok(Ensured::default());
        }

        let id = self.ids.next();
        let job = ShellJobBuilder::new()
            .namespace(self.config.namespace.clone())
            .for_build(build.reference())
            .provisioner_id(id.clone())
            .image(self.config.image())
            .credentials_secret(build.spec.connector.credentials.name.clone())
            .script(spec.script.clone())
            .backoff_limit(self.config.job_backoff_limit)
            .build()?;

        let applied = self.store.apply_job(&job).await?;
        tracing::info!(
            build = %build.reference(),
            provisioner_id = %id,
            job = %job.key(),
            ?applied,
            "ensured execution unit"
        );
        Ok(Ensured {
            assigned: Some(id),
            requeue_after: Some(self.config.requeue_after),
        })
    }

    /// Ensure the build's next pending provisioner and record its new run.
    ///
    /// Returns `Ensured::default()` when no provisioner is ready to run.
    pub async fn ensure_next(&self, build: &mut Build) -> Result<Ensured, OrchestrateError> {
        let Some(index) = build.next_provisioner() else {
            return Ok(Ensured::default());
        };
        let ensured = self.ensure(build, &build.spec.provisioners[index]).await?;
        if let Some(id) = &ensured.assigned {
            build.spec.provisioners[index].assign_correlation_id(id.clone());
            build.refresh_status(build.status.machine_ready);
        }
        Ok(ensured)
    }
}

/// Fold a resolved outcome into the provisioner running under `id`.
///
/// Returns false when no provisioner of the build carries that id, which
/// happens when an outcome arrives for a superseded run.
pub fn record_outcome(build: &mut Build, id: &CorrelationId, outcome: &JobOutcome) -> bool {
    let Some(spec) = build
        .spec
        .provisioners
        .iter_mut()
        .find(|p| p.uuid.as_ref() == Some(id))
    else {
        return false;
    };
    spec.apply_outcome(outcome);
    build.refresh_status(build.status.machine_ready);
    true
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
