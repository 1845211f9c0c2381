// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution unit descriptors for shell provisioner runs
//!
//! The unit's container reads everything it needs from its environment:
//! connection details come from the build's credentials secret, the script
//! either inline or from a config map key.

use forge_core::{BuildRef, CorrelationId, CorrelationKey, EnvSource, EnvVar, Job, JobSpec, ScriptSource};
use thiserror::Error;

pub const ENV_SSH_HOST: &str = "FORGE_SSH_HOST";
pub const ENV_SSH_PORT: &str = "FORGE_SSH_PORT";
pub const ENV_SSH_USERNAME: &str = "FORGE_SSH_USERNAME";
pub const ENV_SSH_PASSWORD: &str = "FORGE_SSH_PASSWORD";
pub const ENV_SSH_PRIVATE_KEY: &str = "FORGE_SSH_PRIVATE_KEY";
pub const ENV_PROVISIONER_ID: &str = "FORGE_PROVISIONER_ID";
pub const ENV_SCRIPT: &str = "FORGE_SCRIPT";

/// Prefix of every execution unit name
pub const JOB_NAME_PREFIX: &str = "forge-shell";

const MAX_NAME_LEN: usize = 63;
const MAX_BUILD_SEGMENT: usize = 42;

/// (env var, secret key, optional)
const SECRET_ENV: [(&str, &str, bool); 5] = [
    (ENV_SSH_HOST, "host", false),
    (ENV_SSH_PORT, "port", false),
    (ENV_SSH_USERNAME, "username", false),
    (ENV_SSH_PASSWORD, "password", true),
    (ENV_SSH_PRIVATE_KEY, "privateKey", true),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobBuildError {
    #[error("execution unit is missing required field: {0}")]
    MissingField(&'static str),
}

/// Assembles the [`Job`] for one provisioner run
#[derive(Debug, Clone, Default)]
pub struct ShellJobBuilder {
    namespace: Option<String>,
    build: Option<BuildRef>,
    provisioner_id: Option<CorrelationId>,
    image: Option<String>,
    credentials_secret: Option<String>,
    script: Option<ScriptSource>,
    backoff_limit: u32,
}

impl ShellJobBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn for_build(mut self, build: BuildRef) -> Self {
        self.build = Some(build);
        self
    }

    pub fn provisioner_id(mut self, id: CorrelationId) -> Self {
        self.provisioner_id = Some(id);
        self
    }

    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn credentials_secret(mut self, name: impl Into<String>) -> Self {
        self.credentials_secret = Some(name.into());
        self
    }

    pub fn script(mut self, script: ScriptSource) -> Self {
        self.script = Some(script);
        self
    }

    pub fn backoff_limit(mut self, limit: u32) -> Self {
        self.backoff_limit = limit;
        self
    }

    pub fn build(self) -> Result<Job, JobBuildError> {
        let namespace = required(self.namespace, "namespace")?;
        let build = self.build.ok_or(JobBuildError::MissingField("build"))?;
        if build.name.is_empty() {
            return Err(JobBuildError::MissingField("build name"));
        }
        if build.namespace.is_empty() {
            return Err(JobBuildError::MissingField("build namespace"));
        }
        let id = self
            .provisioner_id
            .filter(|id| !id.as_str().is_empty())
            .ok_or(JobBuildError::MissingField("provisioner id"))?;
        let image = required(self.image, "image")?;
        let secret = required(self.credentials_secret, "credentials secret")?;
        let script = match self.script {
            Some(ScriptSource::Inline(s)) if s.is_empty() => None,
            Some(ScriptSource::ConfigMap(r)) if r.name.is_empty() || r.key.is_empty() => None,
            other => other,
        }
        .ok_or(JobBuildError::MissingField("script"))?;

        let mut env: Vec<EnvVar> = SECRET_ENV
            .iter()
            .map(|(name, key, optional)| EnvVar {
                name: (*name).to_string(),
                source: EnvSource::SecretKey {
                    secret: secret.clone(),
                    key: (*key).to_string(),
                    optional: *optional,
                },
            })
            .collect();
        env.push(EnvVar::value(ENV_PROVISIONER_ID, id.as_str()));
        env.push(match script {
            ScriptSource::Inline(run) => EnvVar::value(ENV_SCRIPT, run),
            ScriptSource::ConfigMap(r) => EnvVar {
                name: ENV_SCRIPT.to_string(),
                source: EnvSource::ConfigMapKey {
                    config_map: r.name,
                    key: r.key,
                },
            },
        });

        let name = job_name(&build.name, &id);
        let labels = CorrelationKey::new(build, id).to_labels();
        Ok(Job {
            namespace,
            name,
            labels,
            spec: JobSpec {
                image,
                env,
                args: vec!["run".to_string()],
                backoff_limit: self.backoff_limit,
                selector: None,
            },
            ..Job::default()
        })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, JobBuildError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(JobBuildError::MissingField(field))
}

/// `forge-shell-<build>-<id prefix>`, kept to a valid DNS label
pub fn job_name(build_name: &str, id: &CorrelationId) -> String {
    let build: String = dns_segment(build_name).chars().take(MAX_BUILD_SEGMENT).collect();
    let name = format!(
        "{}-{}-{}",
        JOB_NAME_PREFIX,
        build.trim_end_matches('-'),
        dns_segment(id.short())
    );
    let name: String = name.chars().take(MAX_NAME_LEN).collect();
    name.trim_end_matches('-').to_string()
}

fn dns_segment(s: &str) -> String {
    let lowered: String = s
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_alphanumeric() {
                c
            } else {
                '-'
            }
        })
        .collect();
    lowered.trim_matches('-').to_string()
}

#[cfg(test)]
#[path = "job_builder_tests.rs"]
mod tests;
