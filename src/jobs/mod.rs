// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Simulation job types, retry policy and the lifecycle tracker.

pub mod backoff;
pub mod tracker;
mod types;

pub use backoff::{retry_with_backoff, BackoffPolicy, RetryFailure};
pub use tracker::{JobTracker, TrackerSettings};
pub use types::{
    JobHandle, JobKey, JobResources, JobSpec, JobState, JobStatus, OutputLocation, RemoteJobId, RemoteStatus,
    SimulationType, SubmissionReceipt,
};
