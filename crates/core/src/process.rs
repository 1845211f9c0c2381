// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process groups (pods) backing an execution unit

use crate::labels::Labels;
use crate::outcome::ContainerFailure;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminatedState {
    pub exit_code: i32,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContainerStatus {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminated: Option<TerminatedState>,
}

impl ContainerStatus {
    pub fn terminated(name: impl Into<String>, exit_code: i32) -> Self {
        Self {
            name: name.into(),
            terminated: Some(TerminatedState {
                exit_code,
                ..TerminatedState::default()
            }),
        }
    }

    pub fn running(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            terminated: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessGroup {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub init_container_statuses: Vec<ContainerStatus>,
    #[serde(default)]
    pub container_statuses: Vec<ContainerStatus>,
}

impl ProcessGroup {
    /// Terminated state per container name.
    ///
    /// Init containers are collected first, so a main container sharing a
    /// name with an init container wins.
    pub fn terminated_containers(&self) -> BTreeMap<String, TerminatedState> {
        self.init_container_statuses
            .iter()
            .chain(self.container_statuses.iter())
            .filter_map(|s| s.terminated.clone().map(|t| (s.name.clone(), t)))
            .collect()
    }

    /// One failure per container that exited non-zero
    pub fn failures(&self) -> Vec<ContainerFailure> {
        self.terminated_containers()
            .into_iter()
            .filter(|(_, t)| t.exit_code != 0)
            .map(|(container, t)| ContainerFailure {
                container,
                exit_code: t.exit_code,
                reason: t.reason,
                message: t.message,
            })
            .collect()
    }
}
