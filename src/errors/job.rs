// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use crate::jobs::{JobHandle, JobStatus};

/// Errors reported by a remote compute service.
///
/// The split matters to the tracker: transient errors are retried with
/// backoff, rejections are permanent and surface as a failed job.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComputeError {
    /// The service could not be reached or answered with a retryable error.
    #[error("Compute service unavailable: {0}")]
    Transient(String),

    /// The service refused the request; retrying will not help.
    #[error("Compute service rejected request: {0}")]
    Rejected(String),
}

impl ComputeError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ComputeError::Transient(_))
    }
}

/// Errors of the job lifecycle tracker.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerError {
    #[error("Unknown job handle {0}")]
    UnknownHandle(JobHandle),

    #[error("Job {handle} has not succeeded (status: {status})")]
    JobNotSucceeded { handle: JobHandle, status: JobStatus },

    /// The handle was abandoned locally; the tracker no longer polls it.
    #[error("Job {0} was abandoned")]
    JobAbandoned(JobHandle),

    /// Retries were exhausted without an answer; nothing was committed.
    #[error("Compute service unreachable during {operation} after {attempts} attempt(s): {last_error}")]
    ComputeUnreachable {
        operation: &'static str,
        attempts: u32,
        last_error: String,
    },

    #[error("Output of job {handle} could not be fetched: {diagnostic}")]
    FetchRejected { handle: JobHandle, diagnostic: String },

    /// The remote returned a different number of job ids than specs submitted.
    #[error("Malformed submission receipt: expected {expected} job id(s), got {actual}")]
    MalformedReceipt { expected: usize, actual: usize },
}
