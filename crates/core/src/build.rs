// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build requests: a target machine plus its ordered provisioners

use crate::labels::BuildRef;
use crate::provisioner::{ProvisionerSpec, ProvisionerStatus};
use serde::{Deserialize, Serialize};

/// Reference to the infrastructure object describing the machine to build
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ObjectReference {
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
}

/// Reference to a secret by name
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SecretRef {
    pub name: String,
}

/// How provisioners reach the machine
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectorSpec {
    /// Secret holding host, port, username, password and/or private key
    pub credentials: SecretRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSpec {
    pub infrastructure_ref: ObjectReference,
    pub connector: ConnectorSpec,
    #[serde(default)]
    pub provisioners: Vec<ProvisionerSpec>,
}

/// Observed phase of a build, always derived from provisioner state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStatus {
    pub machine_ready: bool,
    pub connected: bool,
    pub provisioners_ready: bool,
    pub ready: bool,
}

impl BuildStatus {
    /// Compute the phase booleans from the machine state and provisioners
    pub fn derive(machine_ready: bool, provisioners: &[ProvisionerSpec]) -> Self {
        let connected = provisioners.iter().any(|p| {
            matches!(
                p.status,
                ProvisionerStatus::Running | ProvisionerStatus::Completed | ProvisionerStatus::Failed
            )
        });
        let provisioners_ready = provisioners.iter().all(ProvisionerSpec::is_satisfied);
        Self {
            machine_ready,
            connected,
            provisioners_ready,
            ready: machine_ready && connected && provisioners_ready,
        }
    }
}

/// Top-level request describing a target machine and its provisioning steps
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Build {
    pub name: String,
    pub namespace: String,
    pub spec: BuildSpec,
    #[serde(default)]
    pub status: BuildStatus,
}

impl Build {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    pub fn with_credentials_secret(mut self, name: impl Into<String>) -> Self {
        self.spec.connector.credentials.name = name.into();
        self
    }

    pub fn with_provisioner(mut self, provisioner: ProvisionerSpec) -> Self {
        self.spec.provisioners.push(provisioner);
        self
    }

    pub fn reference(&self) -> BuildRef {
        BuildRef::new(self.namespace.clone(), self.name.clone())
    }

    /// Index of the provisioner that should run next.
    ///
    /// Provisioners run strictly in order. A terminal failure that is not
    /// allowed to fail halts the walk, as does reaching the end of the list.
    pub fn next_provisioner(&self) -> Option<usize> {
        for (i, p) in self.spec.provisioners.iter().enumerate() {
            if p.is_satisfied() {
                continue;
            }
            if p.is_terminal() {
                return None;
            }
            return Some(i);
        }
        None
    }

    /// Recompute the derived status in place
    pub fn refresh_status(&mut self, machine_ready: bool) {
        self.status = BuildStatus::derive(machine_ready, &self.spec.provisioners);
    }
}

#[cfg(test)]
#[path = "build_tests.rs"]
mod tests;
