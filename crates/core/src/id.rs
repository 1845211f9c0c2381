// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Correlation id generation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identifier minted once per provisioner run.
///
/// Links an execution unit back to the provisioner that requested it. A retry
/// mints a fresh id, so the same value never names two runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading characters suitable for embedding in object names
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(8)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CorrelationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CorrelationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Mints correlation ids
pub trait IdGen: Clone + Send + Sync + 'static {
    fn next(&self) -> CorrelationId;
}

/// Random v4 UUIDs, used in production
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn next(&self) -> CorrelationId {
        CorrelationId(uuid::Uuid::new_v4().to_string())
    }
}

/// Predictable ids for tests: `<prefix>-1`, `<prefix>-2`, ...
#[derive(Clone, Debug)]
pub struct SequentialIdGen {
    prefix: String,
    counter: Arc<AtomicU64>,
}

impl SequentialIdGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }

    /// How many ids have been handed out so far
    pub fn issued(&self) -> u64 {
        self.counter.load(Ordering::SeqCst) - 1
    }
}

impl Default for SequentialIdGen {
    fn default() -> Self {
        Self::new("run")
    }
}

impl IdGen for SequentialIdGen {
    fn next(&self) -> CorrelationId {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        CorrelationId(format!("{}-{}", self.prefix, n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_ids_are_unique_and_uuid_shaped() {
        let ids = UuidIdGen;
        let a = ids.next();
        let b = ids.next();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
        assert!(uuid::Uuid::parse_str(a.as_str()).is_ok());
    }

    #[test]
    fn sequential_ids_share_a_counter_across_clones() {
        let ids = SequentialIdGen::new("run");
        let clone = ids.clone();
        assert_eq!(ids.next().as_str(), "run-1");
        assert_eq!(clone.next().as_str(), "run-2");
        assert_eq!(ids.issued(), 2);
    }

    #[test]
    fn short_truncates_to_eight_characters() {
        let id = CorrelationId::new("0123456789abcdef");
        assert_eq!(id.short(), "01234567");
        assert_eq!(CorrelationId::new("abc").short(), "abc");
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = CorrelationId::new("run-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"run-1\"");
    }
}
