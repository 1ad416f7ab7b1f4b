// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::errors::ComputeError;
use crate::jobs::{JobSpec, OutputLocation, RemoteJobId, RemoteStatus, SubmissionReceipt};

/// Remote side of the job lifecycle: a cluster scheduler, a workflow service or a
/// local process launcher.
///
/// Implementations report retryable problems as [`ComputeError::Transient`] and
/// permanent refusals as [`ComputeError::Rejected`]. There is no cancellation
/// call; abandoning a job is a purely local decision of the tracker.
#[async_trait]
pub trait ComputeService: Send + Sync {
    /// Submit all specs as one grouped request. The receipt lists one remote id per
    /// spec, in order.
    async fn submit(&self, specs: &[JobSpec]) -> Result<SubmissionReceipt, ComputeError>;

    async fn status(&self, job: &RemoteJobId) -> Result<RemoteStatus, ComputeError>;

    /// Location of the output of a finished job.
    async fn fetch(&self, job: &RemoteJobId) -> Result<OutputLocation, ComputeError>;

    fn name(&self) -> &'static str;
}
