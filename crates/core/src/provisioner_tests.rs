// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::outcome::ContainerFailure;
use yare::parameterized;

fn failure(container: &str, code: i32) -> ContainerFailure {
    ContainerFailure {
        container: container.to_string(),
        exit_code: code,
        reason: "Error".to_string(),
        message: "script exited".to_string(),
    }
}

#[test]
fn script_source_requires_exactly_one_field() {
    let r = ConfigMapKeyRef {
        name: "scripts".into(),
        key: "setup.sh".into(),
    };
    assert_eq!(
        ScriptSource::from_parts(Some("echo".into()), Some(r.clone())),
        Err(ModelError::ConflictingScriptSource)
    );
    assert_eq!(
        ScriptSource::from_parts(None, None),
        Err(ModelError::MissingScriptSource)
    );
    assert_eq!(
        ScriptSource::from_parts(None, Some(r.clone())),
        Ok(ScriptSource::ConfigMap(r))
    );
}

#[test]
fn deserializes_persisted_form() {
    let json = r#"{
        "type": "built-in/shell",
        "run": "apt-get update",
        "status": "Running",
        "uuid": "run-1",
        "retries": 2,
        "allowFail": true
    }"#;
    let spec: ProvisionerSpec = serde_json::from_str(json).unwrap();
    assert_eq!(spec.kind, ProvisionerType::BuiltinShell);
    assert_eq!(spec.script, ScriptSource::Inline("apt-get update".into()));
    assert_eq!(spec.status, ProvisionerStatus::Running);
    assert_eq!(spec.uuid, Some(CorrelationId::new("run-1")));
    assert_eq!(spec.retries, 2);
    assert!(spec.allow_fail);
    assert_eq!(spec.failure_reason, None);
}

#[parameterized(
    both_sources = { r#"{"type":"external","run":"x","runConfigMapRef":{"name":"a","key":"b"}}"# },
    no_source = { r#"{"type":"external"}"# },
    unknown_type = { r#"{"type":"ansible","run":"x"}"# },
    unknown_status = { r#"{"run":"x","status":"Exploded"}"# },
)]
fn rejects_invalid_persisted_form(json: &str) {
    assert!(serde_json::from_str::<ProvisionerSpec>(json).is_err());
}

#[test]
fn serializes_config_map_source_without_run() {
    let spec = ProvisionerSpec::shell_config_map("scripts", "setup.sh");
    let value = serde_json::to_value(&spec).unwrap();
    assert_eq!(value["type"], "built-in/shell");
    assert_eq!(value["runConfigMapRef"]["name"], "scripts");
    assert!(value.get("run").is_none());
    assert!(value.get("uuid").is_none());
    assert_eq!(value["status"], "Pending");
}

#[test]
fn assigning_an_id_starts_a_run() {
    let mut spec = ProvisionerSpec::shell_inline("true");
    spec.assign_correlation_id("run-1".into());
    assert_eq!(spec.uuid, Some(CorrelationId::new("run-1")));
    assert_eq!(spec.status, ProvisionerStatus::Running);
}

#[test]
fn success_completes_the_step() {
    let mut spec = ProvisionerSpec::shell_inline("true");
    spec.assign_correlation_id("run-1".into());
    spec.apply_outcome(&JobOutcome::Succeeded);
    assert_eq!(spec.status, ProvisionerStatus::Completed);
    assert!(spec.is_terminal());
    assert!(spec.is_satisfied());
}

#[test]
fn failure_with_retries_starts_over_with_a_fresh_run() {
    let mut spec = ProvisionerSpec::shell_inline("false").with_retries(1);
    spec.assign_correlation_id("run-1".into());

    spec.apply_outcome(&JobOutcome::Failed {
        failures: vec![failure("shell", 1)],
    });

    assert_eq!(spec.retries, 0);
    assert_eq!(spec.uuid, None);
    assert_eq!(spec.status, ProvisionerStatus::Pending);
    assert_eq!(spec.failure_reason, None);
}

#[test]
fn failure_without_retries_is_terminal_and_records_the_first_container() {
    let mut spec = ProvisionerSpec::shell_inline("false");
    spec.assign_correlation_id("run-1".into());

    spec.apply_outcome(&JobOutcome::Failed {
        failures: vec![failure("shell", 7), failure("sidecar", 2)],
    });

    assert_eq!(spec.status, ProvisionerStatus::Failed);
    assert_eq!(spec.failure_reason.as_deref(), Some("Error"));
    let message = spec.failure_message.unwrap();
    assert!(message.contains("shell"), "got: {}", message);
    assert!(message.contains("code 7"), "got: {}", message);
    assert_eq!(spec.uuid, Some(CorrelationId::new("run-1")));
}

#[test]
fn failure_without_containers_uses_generic_reason() {
    let mut spec = ProvisionerSpec::shell_inline("false");
    spec.apply_outcome(&JobOutcome::Failed { failures: vec![] });
    assert_eq!(spec.failure_reason.as_deref(), Some(JOB_FAILED_REASON));
}

#[parameterized(
    completed = { ProvisionerStatus::Completed, false, true },
    failed_blocking = { ProvisionerStatus::Failed, false, false },
    failed_allowed = { ProvisionerStatus::Failed, true, true },
    running = { ProvisionerStatus::Running, true, false },
    pending = { ProvisionerStatus::Pending, true, false },
)]
fn satisfaction_follows_status_and_allow_fail(
    status: ProvisionerStatus,
    allow_fail: bool,
    expected: bool,
) {
    let mut spec = ProvisionerSpec::shell_inline("true").with_allow_fail(allow_fail);
    spec.status = status;
    assert_eq!(spec.is_satisfied(), expected);
}
