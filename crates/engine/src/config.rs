// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controller configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_NAMESPACE: &str = "forge-core";
pub const DEFAULT_IMAGE_REPO: &str = "ghcr.io/forge-build/forge-provisioner-shell";
pub const DEFAULT_IMAGE_TAG: &str = "latest";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("parsing controller config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid controller config: {0}")]
    Invalid(String),
}

/// Settings for orchestrating and watching execution units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerConfig {
    /// Namespace execution units are created in and watched from
    pub namespace: String,
    pub image_repo: String,
    pub image_tag: String,
    /// Pod restarts the scheduler may attempt inside one unit
    pub job_backoff_limit: u32,
    /// Delay before re-checking a build after creating its unit
    #[serde(with = "humantime_serde")]
    pub requeue_after: Duration,
    /// First retry delay after a failed reconcile
    #[serde(with = "humantime_serde")]
    pub backoff_base: Duration,
    #[serde(with = "humantime_serde")]
    pub backoff_max: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            image_repo: DEFAULT_IMAGE_REPO.to_string(),
            image_tag: DEFAULT_IMAGE_TAG.to_string(),
            job_backoff_limit: 0,
            requeue_after: Duration::from_secs(2),
            backoff_base: Duration::from_millis(5),
            backoff_max: Duration::from_secs(1000),
        }
    }
}

impl ControllerConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.is_empty() {
            return Err(ConfigError::Invalid("namespace must not be empty".into()));
        }
        if self.image_repo.is_empty() || self.image_tag.is_empty() {
            return Err(ConfigError::Invalid(
                "image_repo and image_tag must not be empty".into(),
            ));
        }
        if self.backoff_base > self.backoff_max {
            return Err(ConfigError::Invalid(
                "backoff_base must not exceed backoff_max".into(),
            ));
        }
        Ok(())
    }

    /// `repo:tag` of the execution unit image
    pub fn image(&self) -> String {
        format!("{}:{}", self.image_repo, self.image_tag)
    }

    /// Retry delay after `failures` consecutive failed reconciles
    pub fn backoff(&self, failures: u32) -> Duration {
        let factor = 1u32
            .checked_shl(failures.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.backoff_base
            .checked_mul(factor)
            .unwrap_or(self.backoff_max)
            .min(self.backoff_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[test]
    fn defaults_match_published_image() {
        let config = ControllerConfig::default();
        assert_eq!(config.namespace, "forge-core");
        assert_eq!(
            config.image(),
            "ghcr.io/forge-build/forge-provisioner-shell:latest"
        );
        assert_eq!(config.requeue_after, Duration::from_secs(2));
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = ControllerConfig::from_toml(
            r#"
            namespace = "forge-system"
            image_tag = "v0.3.1"
            requeue_after = "500ms"
            "#,
        )
        .unwrap();
        assert_eq!(config.namespace, "forge-system");
        assert_eq!(
            config.image(),
            "ghcr.io/forge-build/forge-provisioner-shell:v0.3.1"
        );
        assert_eq!(config.requeue_after, Duration::from_millis(500));
        assert_eq!(config.backoff_max, Duration::from_secs(1000));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = ControllerConfig::from_toml("namespce = \"typo\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "got: {}", err);
    }

    #[test]
    fn empty_namespace_is_invalid() {
        let err = ControllerConfig::from_toml("namespace = \"\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "got: {}", err);
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("controller.toml");
        std::fs::write(&path, "backoff_base = \"1s\"\n").unwrap();

        let config = ControllerConfig::load(&path).unwrap();
        assert_eq!(config.backoff_base, Duration::from_secs(1));

        let missing = ControllerConfig::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Read { .. }));
    }

    #[parameterized(
        first = { 1, 5 },
        second = { 2, 10 },
        fifth = { 5, 80 },
        capped = { 30, 1_000_000 },
        overflow = { 200, 1_000_000 },
    )]
    fn backoff_doubles_up_to_cap(failures: u32, expected_ms: u64) {
        let config = ControllerConfig::default();
        assert_eq!(config.backoff(failures), Duration::from_millis(expected_ms));
    }
}
