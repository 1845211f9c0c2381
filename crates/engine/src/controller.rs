// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Keyed work queue driving a [`Reconciler`]
//!
//! Keys arrive on a channel, usually from an informer that has already
//! applied its event filter. Each key is reconciled by at most one task at a
//! time: a key that arrives while its reconcile is running is marked dirty
//! and rerun once that reconcile finishes. Failures requeue with exponential
//! backoff.

use crate::config::ControllerConfig;
use async_trait::async_trait;
use forge_core::ObjectKey;
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::Instrument;

/// When a key should be looked at again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requeue {
    Done,
    After(Duration),
}

#[async_trait]
pub trait Reconciler: Send + Sync + 'static {
    type Error: Display + Send;

    async fn reconcile(&self, key: &ObjectKey) -> Result<Requeue, Self::Error>;
}

type Completion = (ObjectKey, Result<Requeue, String>);

/// Reports a reconcile's result when dropped, so a panicking task cannot
/// leave its key marked in flight forever
struct InFlight {
    key: Option<ObjectKey>,
    result: Option<Result<Requeue, String>>,
    done: mpsc::UnboundedSender<Completion>,
}

impl InFlight {
    fn finish(mut self, result: Result<Requeue, String>) {
        self.result = Some(result);
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            let result = self
                .result
                .take()
                .unwrap_or_else(|| Err("reconcile task aborted".to_string()));
            let _ = self.done.send((key, result));
        }
    }
}

#[derive(Default)]
struct QueueState {
    in_flight: HashSet<ObjectKey>,
    dirty: HashSet<ObjectKey>,
    failures: HashMap<ObjectKey, u32>,
}

pub struct Controller<R> {
    reconciler: Arc<R>,
    config: ControllerConfig,
}

impl<R: Reconciler> Controller<R> {
    pub fn new(reconciler: R, config: ControllerConfig) -> Self {
        Self {
            reconciler: Arc::new(reconciler),
            config,
        }
    }

    pub fn reconciler(&self) -> &R {
        &self.reconciler
    }

    /// Process keys until `keys` closes and no reconcile is running.
    ///
    /// Requeues still waiting on their delay at that point are dropped.
    pub async fn run(&self, mut keys: mpsc::Receiver<ObjectKey>) {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();
        let (requeue_tx, mut requeue_rx) = mpsc::unbounded_channel::<ObjectKey>();
        let mut state = QueueState::default();
        let mut input_open = true;

        loop {
            if !input_open && state.in_flight.is_empty() {
                break;
            }
            tokio::select! {
                key = keys.recv(), if input_open => match key {
                    Some(key) => self.enqueue(key, &mut state, &done_tx),
                    None => {
                        tracing::debug!("key channel closed, draining");
                        input_open = false;
                    }
                },
                Some(key) = requeue_rx.recv() => self.enqueue(key, &mut state, &done_tx),
                Some((key, result)) = done_rx.recv() => {
                    state.in_flight.remove(&key);
                    if let Some(delay) = self.next_attempt(&key, result, &mut state) {
                        schedule(key.clone(), delay, &requeue_tx);
                    }
                    if state.dirty.remove(&key) {
                        self.start(key, &mut state, &done_tx);
                    }
                }
            }
        }
    }

    fn enqueue(&self, key: ObjectKey, state: &mut QueueState, done: &mpsc::UnboundedSender<Completion>) {
        if state.in_flight.contains(&key) {
            tracing::trace!(key = %key, "reconcile in flight, marking dirty");
            state.dirty.insert(key);
        } else {
            self.start(key, state, done);
        }
    }

    fn start(&self, key: ObjectKey, state: &mut QueueState, done: &mpsc::UnboundedSender<Completion>) {
        state.in_flight.insert(key.clone());
        let reconciler = Arc::clone(&self.reconciler);
        let guard = InFlight {
            key: Some(key.clone()),
            result: None,
            done: done.clone(),
        };
        let span = tracing::info_span!("reconcile", key = %key);
        tokio::spawn(
            async move {
                let result = reconciler.reconcile(&key).await.map_err(|e| e.to_string());
                guard.finish(result);
            }
            .instrument(span),
        );
    }

    /// Delay before the key's next attempt, if it needs one
    fn next_attempt(
        &self,
        key: &ObjectKey,
        result: Result<Requeue, String>,
        state: &mut QueueState,
    ) -> Option<Duration> {
        match result {
            Ok(Requeue::Done) => {
                state.failures.remove(key);
                None
            }
            Ok(Requeue::After(delay)) => {
                state.failures.remove(key);
                Some(delay)
            }
            Err(e) => {
                let failures = state.failures.entry(key.clone()).or_insert(0);
                *failures += 1;
                let delay = self.config.backoff(*failures);
                tracing::warn!(
                    key = %key,
                    error = %e,
                    failures = *failures,
                    retry_in_ms = delay.as_millis() as u64,
                    "reconcile failed"
                );
                Some(delay)
            }
        }
    }
}

fn schedule(key: ObjectKey, delay: Duration, requeue: &mpsc::UnboundedSender<ObjectKey>) {
    let requeue = requeue.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let _ = requeue.send(key);
    });
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
