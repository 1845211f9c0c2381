// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::outcome::{FakeOutcomeSink, OutcomeCall};
use crate::store::{FakeClusterStore, StoreCall, StoreOp};
use forge_core::{BuildRef, CorrelationId, JobSpec};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// A writer that captures log output for testing
#[derive(Clone, Default)]
struct CapturedLogs {
    logs: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn contents(&self) -> String {
        let logs = self.logs.lock().unwrap();
        String::from_utf8_lossy(&logs).to_string()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.logs.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run a test with captured tracing output
fn with_tracing<F, Fut>(f: F) -> (String, Fut::Output)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future,
{
    let logs = CapturedLogs::default();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(logs.clone())
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f())
    });

    (logs.contents(), result)
}

fn job() -> Job {
    Job {
        namespace: "forge-core".into(),
        name: "forge-shell-ubuntu-1a2b3c4d".into(),
        spec: JobSpec {
            image: "ghcr.io/forge-build/forge-provisioner-shell:latest".into(),
            ..JobSpec::default()
        },
        ..Job::default()
    }
}

fn correlation() -> CorrelationKey {
    CorrelationKey::new(
        BuildRef::new("default", "ubuntu"),
        CorrelationId::new("1a2b3c4d-0000"),
    )
}

#[test]
fn traced_apply_logs_span_result_and_timing() {
    let (logs, result) = with_tracing(|| async {
        let traced = TracedClusterStore::new(FakeClusterStore::new());
        traced.apply_job(&job()).await
    });

    assert_eq!(result.unwrap(), ApplyResult::Created);
    assert!(
        logs.contains("store.apply_job"),
        "Should log span name. Logs:\n{}",
        logs
    );
    assert!(
        logs.contains("forge-core/forge-shell-ubuntu-1a2b3c4d"),
        "Should log job key. Logs:\n{}",
        logs
    );
    assert!(
        logs.contains("Created"),
        "Should log apply result. Logs:\n{}",
        logs
    );
    assert!(
        logs.contains("elapsed_ms"),
        "Should log timing. Logs:\n{}",
        logs
    );
}

#[test]
fn traced_apply_logs_backend_error() {
    let (logs, result) = with_tracing(|| async {
        let fake = FakeClusterStore::new();
        fake.fail_next(StoreOp::Apply, StoreError::Backend("quota exceeded".into()));
        TracedClusterStore::new(fake).apply_job(&job()).await
    });

    assert!(result.is_err());
    assert!(
        logs.contains("apply failed") && logs.contains("quota exceeded"),
        "Should log the error. Logs:\n{}",
        logs
    );
}

#[test]
fn traced_delete_treats_not_found_as_quiet() {
    let (logs, result) = with_tracing(|| async {
        let traced = TracedClusterStore::new(FakeClusterStore::new());
        traced
            .delete_job(&job().key(), Propagation::Background)
            .await
    });

    assert!(result.unwrap_err().is_not_found());
    assert!(
        logs.contains("already gone"),
        "Should log not-found at debug. Logs:\n{}",
        logs
    );
    assert!(
        !logs.contains("ERROR"),
        "Not found is not an error. Logs:\n{}",
        logs
    );
}

#[test]
fn traced_sink_logs_container_failure_detail() {
    let (logs, result) = with_tracing(|| async {
        let traced = TracedOutcomeSink::new(FakeOutcomeSink::new());
        let failure = ContainerFailure {
            container: "shell".into(),
            exit_code: 7,
            reason: "Error".into(),
            message: "apt-get failed".into(),
        };
        traced.container_failed(&correlation(), &failure).await
    });

    assert!(result.is_ok());
    assert!(
        logs.contains("exit_code=7") && logs.contains("apt-get failed"),
        "Should log failure fields. Logs:\n{}",
        logs
    );
    assert!(
        logs.contains("default/ubuntu"),
        "Should log build reference. Logs:\n{}",
        logs
    );
}

#[tokio::test]
async fn traced_store_delegates_to_inner() {
    let fake = FakeClusterStore::new();
    let traced = TracedClusterStore::new(fake.clone());

    traced.apply_job(&job()).await.unwrap();
    traced.get_job(&job().key()).await.unwrap();

    assert_eq!(
        fake.calls(),
        vec![
            StoreCall::Apply {
                key: job().key(),
                result: Some(ApplyResult::Created),
            },
            StoreCall::Get { key: job().key() },
        ]
    );
}

#[tokio::test]
async fn traced_sink_delegates_and_surfaces_errors() {
    let fake = FakeOutcomeSink::new();
    let traced = TracedOutcomeSink::new(fake.clone());

    traced.job_succeeded(&correlation()).await.unwrap();
    assert_eq!(
        fake.calls(),
        vec![OutcomeCall::Succeeded { key: correlation() }]
    );

    fake.reject_all();
    assert!(traced.job_failed(&correlation()).await.is_err());
}
