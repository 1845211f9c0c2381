// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for the cluster store and outcome reporting

pub mod outcome;
pub mod store;
pub mod traced;

pub use outcome::{NoOpOutcomeSink, OutcomeError, OutcomeSink};
pub use store::{ApplyResult, ClusterStore, Propagation, StoreError};
pub use traced::{TracedClusterStore, TracedOutcomeSink};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use outcome::{FakeOutcomeSink, OutcomeCall};
#[cfg(any(test, feature = "test-support"))]
pub use store::{FakeClusterStore, StoreCall, StoreOp};
