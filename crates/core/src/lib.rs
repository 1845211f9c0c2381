// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! forge-core: domain model for the Forge shell provisioner
//!
//! This crate provides:
//! - Builds and their ordered provisioner steps
//! - Execution units (jobs) and the process groups backing them
//! - Typed ownership metadata linking the two
//! - Correlation id generation

pub mod build;
pub mod id;
pub mod job;
pub mod labels;
pub mod outcome;
pub mod process;
pub mod provisioner;

pub use build::{Build, BuildSpec, BuildStatus, ConnectorSpec, ObjectReference, SecretRef};
pub use id::{CorrelationId, IdGen, SequentialIdGen, UuidIdGen};
pub use job::{
    EnvSource, EnvVar, Job, JobCondition, JobConditionType, JobSpec, JobStatus, LabelSelector,
    ObjectKey,
};
pub use labels::{BuildRef, CorrelationKey, Labels};
pub use outcome::{ContainerFailure, JobOutcome};
pub use process::{ContainerStatus, ProcessGroup, TerminatedState};
pub use provisioner::{
    ConfigMapKeyRef, ModelError, ProvisionerSpec, ProvisionerStatus, ProvisionerType,
    ScriptSource,
};
