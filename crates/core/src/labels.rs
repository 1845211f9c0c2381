// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ownership metadata carried on execution units
//!
//! Labels are the wire form. Inside the crate ownership travels as a
//! [`CorrelationKey`], and label maps are only touched when rendering or
//! parsing one.

use crate::id::CorrelationId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Label naming the component that manages an execution unit
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Value of [`MANAGED_BY_LABEL`] on units created by the shell provisioner
pub const SHELL_PROVISIONER_NAME: &str = "forge-provisioner-shell";

/// Label carrying the owning build's name
pub const BUILD_NAME_LABEL: &str = "forge.build/build-name";

/// Label carrying the owning build's namespace
pub const BUILD_NAMESPACE_LABEL: &str = "forge.build/build-namespace";

/// Label carrying the provisioner run's correlation id
pub const PROVISIONER_ID_LABEL: &str = "forge.build/provisioner-id";

/// Selector label the scheduler stamps on a job's pods
pub const CONTROLLER_UID_LABEL: &str = "controller-uid";

/// Newer platforms prefix the selector label
pub const BATCH_CONTROLLER_UID_LABEL: &str = "batch.kubernetes.io/controller-uid";

pub type Labels = BTreeMap<String, String>;

/// Namespaced reference to a build
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuildRef {
    pub namespace: String,
    pub name: String,
}

impl BuildRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for BuildRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

/// Links one execution unit to the build and provisioner run that own it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationKey {
    pub build: BuildRef,
    pub provisioner_id: CorrelationId,
}

impl CorrelationKey {
    pub fn new(build: BuildRef, provisioner_id: CorrelationId) -> Self {
        Self {
            build,
            provisioner_id,
        }
    }

    /// Parse ownership from a label map.
    ///
    /// Requires non-empty build-name and provisioner-id labels. The build
    /// namespace label is optional and defaults to empty.
    pub fn from_labels(labels: &Labels) -> Option<Self> {
        let name = non_empty(labels, BUILD_NAME_LABEL)?;
        let id = non_empty(labels, PROVISIONER_ID_LABEL)?;
        let namespace = labels
            .get(BUILD_NAMESPACE_LABEL)
            .cloned()
            .unwrap_or_default();
        Some(Self {
            build: BuildRef::new(namespace, name),
            provisioner_id: CorrelationId::new(id),
        })
    }

    /// Render the ownership labels, including the managed-by marker
    pub fn to_labels(&self) -> Labels {
        let mut labels = Labels::new();
        labels.insert(MANAGED_BY_LABEL.into(), SHELL_PROVISIONER_NAME.into());
        labels.insert(BUILD_NAME_LABEL.into(), self.build.name.clone());
        labels.insert(BUILD_NAMESPACE_LABEL.into(), self.build.namespace.clone());
        labels.insert(
            PROVISIONER_ID_LABEL.into(),
            self.provisioner_id.as_str().to_string(),
        );
        labels
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.build, self.provisioner_id)
    }
}

fn non_empty(labels: &Labels, key: &str) -> Option<String> {
    labels.get(key).filter(|v| !v.is_empty()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip_through_key() {
        let key = CorrelationKey::new(BuildRef::new("images", "ubuntu-2204"), "run-1".into());
        let labels = key.to_labels();
        assert_eq!(
            labels.get(MANAGED_BY_LABEL).map(String::as_str),
            Some(SHELL_PROVISIONER_NAME)
        );
        assert_eq!(CorrelationKey::from_labels(&labels), Some(key));
    }

    #[test]
    fn missing_or_empty_ids_do_not_parse() {
        let mut labels = Labels::new();
        labels.insert(BUILD_NAME_LABEL.into(), "b".into());
        assert_eq!(CorrelationKey::from_labels(&labels), None);

        labels.insert(PROVISIONER_ID_LABEL.into(), String::new());
        assert_eq!(CorrelationKey::from_labels(&labels), None);
    }

    #[test]
    fn namespace_label_is_optional() {
        let mut labels = Labels::new();
        labels.insert(BUILD_NAME_LABEL.into(), "b".into());
        labels.insert(PROVISIONER_ID_LABEL.into(), "id".into());
        let key = CorrelationKey::from_labels(&labels).unwrap();
        assert_eq!(key.build.namespace, "");
        assert_eq!(key.to_string(), "b#id");
    }
}
