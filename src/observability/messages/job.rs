// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for simulation job events.
//!
//! This module contains message types for logging events related to:
//! * Grouped submissions and their rejection
//! * Reuse of existing handles for duplicate submissions
//! * State transitions observed while polling
//! * Unreachable compute service and abandoned jobs

use crate::jobs::{JobHandle, JobKey, JobState, OutputLocation, SimulationType};
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Jobs accepted by the compute service.
///
/// # Log Level
/// `info!` - Important operational event
pub struct JobsSubmitted<'a> {
    pub iteration: &'a str,
    pub simulation: SimulationType,
    pub count: usize,
    pub group_id: Option<&'a str>,
}

impl Display for JobsSubmitted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Submitted {} {} simulation(s) for iteration '{}' (group: {})",
            self.count,
            self.simulation,
            self.iteration,
            self.group_id.unwrap_or("none")
        )
    }
}

impl StructuredLog for JobsSubmitted<'_> {
    fn log(&self) {
        tracing::info!(
            iteration = self.iteration,
            simulation = self.simulation.as_str(),
            count = self.count,
            group_id = self.group_id.unwrap_or("none"),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "jobs_submitted",
            span_name = name,
            iteration = self.iteration,
            simulation = self.simulation.as_str(),
            count = self.count,
        )
    }
}

/// The compute service refused a submission; the jobs are recorded as failed.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct JobSubmissionRejected<'a> {
    pub iteration: &'a str,
    pub simulation: SimulationType,
    pub diagnostic: &'a str,
}

impl Display for JobSubmissionRejected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Compute service rejected {} submission for iteration '{}': {}",
            self.simulation, self.iteration, self.diagnostic
        )
    }
}

impl StructuredLog for JobSubmissionRejected<'_> {
    fn log(&self) {
        tracing::error!(
            iteration = self.iteration,
            simulation = self.simulation.as_str(),
            diagnostic = self.diagnostic,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "job_submission_rejected",
            span_name = name,
            iteration = self.iteration,
            simulation = self.simulation.as_str(),
        )
    }
}

/// A submission matched a live or succeeded job.
///
/// # Log Level
/// `debug!` - Diagnostic detail
pub struct JobReused<'a> {
    pub key: &'a JobKey,
    pub handle: &'a JobHandle,
}

impl Display for JobReused<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Reusing job {} for {}", self.handle, self.key)
    }
}

impl StructuredLog for JobReused<'_> {
    fn log(&self) {
        tracing::debug!(key = %self.key, handle = %self.handle, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("job_reused", span_name = name, key = %self.key, handle = %self.handle)
    }
}

/// Polling observed a state transition.
///
/// # Log Level
/// `info!` for success and progress, `warn!` for failure
pub struct JobStateChanged<'a> {
    pub key: &'a JobKey,
    pub handle: &'a JobHandle,
    pub from: JobState,
    pub to: JobState,
}

impl Display for JobStateChanged<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Job {} ({}) moved from {:?} to {:?}",
            self.handle, self.key, self.from, self.to
        )
    }
}

impl StructuredLog for JobStateChanged<'_> {
    fn log(&self) {
        if self.to == JobState::Failed {
            tracing::warn!(key = %self.key, handle = %self.handle, from = ?self.from, to = ?self.to, "{}", self);
        } else {
            tracing::info!(key = %self.key, handle = %self.handle, from = ?self.from, to = ?self.to, "{}", self);
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "job_state_changed",
            span_name = name,
            key = %self.key,
            handle = %self.handle,
            to = ?self.to,
        )
    }
}

/// Retries against the compute service were exhausted.
///
/// # Log Level
/// `warn!` - Degraded operation; callers retry later
pub struct RemoteUnreachable<'a> {
    pub operation: &'a str,
    pub attempts: u32,
    pub last_error: &'a str,
}

impl Display for RemoteUnreachable<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Compute service unreachable for {} after {} attempt(s): {}",
            self.operation, self.attempts, self.last_error
        )
    }
}

impl StructuredLog for RemoteUnreachable<'_> {
    fn log(&self) {
        tracing::warn!(
            operation = self.operation,
            attempts = self.attempts,
            last_error = self.last_error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "remote_unreachable",
            span_name = name,
            operation = self.operation,
            attempts = self.attempts,
        )
    }
}

/// Output location of a succeeded job fetched from the remote.
///
/// # Log Level
/// `info!` - Important operational event
pub struct OutputRetrieved<'a> {
    pub key: &'a JobKey,
    pub handle: &'a JobHandle,
    pub location: &'a OutputLocation,
}

impl Display for OutputRetrieved<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Retrieved output of job {} ({}): {}", self.handle, self.key, self.location)
    }
}

impl StructuredLog for OutputRetrieved<'_> {
    fn log(&self) {
        tracing::info!(key = %self.key, handle = %self.handle, location = %self.location, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("output_retrieved", span_name = name, key = %self.key, handle = %self.handle)
    }
}

/// A job was abandoned locally; the remote job may still run.
///
/// # Log Level
/// `warn!` - Operator-visible decision
pub struct JobAbandoned<'a> {
    pub key: &'a JobKey,
    pub handle: &'a JobHandle,
    pub state: JobState,
}

impl Display for JobAbandoned<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Abandoned job {} ({}) in state {:?}; the remote job is not cancelled",
            self.handle, self.key, self.state
        )
    }
}

impl StructuredLog for JobAbandoned<'_> {
    fn log(&self) {
        tracing::warn!(key = %self.key, handle = %self.handle, state = ?self.state, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("job_abandoned", span_name = name, key = %self.key, handle = %self.handle)
    }
}
