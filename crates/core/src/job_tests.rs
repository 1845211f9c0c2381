// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::labels::BuildRef;
use yare::parameterized;

#[test]
fn controller_uid_prefers_legacy_key() {
    let mut selector = LabelSelector::single(CONTROLLER_UID_LABEL, "abc");
    selector
        .match_labels
        .insert(BATCH_CONTROLLER_UID_LABEL.into(), "def".into());
    assert_eq!(
        selector.controller_uid(),
        Some(LabelSelector::single(CONTROLLER_UID_LABEL, "abc"))
    );
}

#[test]
fn controller_uid_falls_back_to_prefixed_key() {
    let mut selector = LabelSelector::single(CONTROLLER_UID_LABEL, "");
    selector
        .match_labels
        .insert(BATCH_CONTROLLER_UID_LABEL.into(), "def".into());
    assert_eq!(
        selector.controller_uid(),
        Some(LabelSelector::single(BATCH_CONTROLLER_UID_LABEL, "def"))
    );
}

#[test]
fn controller_uid_missing_entirely() {
    assert_eq!(LabelSelector::default().controller_uid(), None);
}

#[test]
fn selector_matches_subset_of_labels() {
    let selector = LabelSelector::single("a", "1");
    let mut labels = Labels::new();
    labels.insert("a".into(), "1".into());
    labels.insert("b".into(), "2".into());
    assert!(selector.matches(&labels));

    labels.insert("a".into(), "2".into());
    assert!(!selector.matches(&labels));
    assert_eq!(selector.to_string(), "a=1");
}

#[parameterized(
    complete = { "Complete", JobConditionType::Complete },
    failed = { "Failed", JobConditionType::Failed },
    suspended = { "Suspended", JobConditionType::Suspended },
    failure_target = { "FailureTarget", JobConditionType::FailureTarget },
)]
fn condition_types_parse_known_names(name: &str, expected: JobConditionType) {
    let parsed = JobConditionType::from(name.to_string());
    assert_eq!(parsed, expected);
    assert_eq!(parsed.to_string(), name);
}

#[test]
fn unknown_condition_type_is_preserved() {
    let json = r#"{"type": "Exploded", "reason": "x"}"#;
    let condition: JobCondition = serde_json::from_str(json).unwrap();
    assert_eq!(condition.kind, JobConditionType::Other("Exploded".into()));
    assert_eq!(serde_json::to_value(&condition).unwrap()["type"], "Exploded");
}

#[test]
fn job_exposes_typed_ownership() {
    let key = CorrelationKey::new(BuildRef::new("images", "ubuntu"), "run-1".into());
    let job = Job {
        namespace: "forge-core".into(),
        name: "forge-shell-ubuntu-run-1".into(),
        labels: key.to_labels(),
        ..Job::default()
    };
    assert_eq!(job.correlation(), Some(key));
    assert!(job.has_build_name());
    assert!(job.has_provisioner_id());
    assert_eq!(job.managed_by(), Some("forge-provisioner-shell"));
    assert_eq!(job.key().to_string(), "forge-core/forge-shell-ubuntu-run-1");
}

#[test]
fn first_condition_is_insertion_order() {
    let job = Job::default()
        .with_condition(JobConditionType::Failed)
        .with_condition(JobConditionType::Complete);
    assert_eq!(
        job.first_condition().map(|c| &c.kind),
        Some(&JobConditionType::Failed)
    );
    assert!(Job::default().first_condition().is_none());
}
