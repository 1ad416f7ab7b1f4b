// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

use crate::model::EventId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationType {
    Forward,
    Adjoint,
}

impl SimulationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimulationType::Forward => "forward",
            SimulationType::Adjoint => "adjoint",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [SimulationType::Forward, SimulationType::Adjoint]
            .into_iter()
            .find(|simulation| simulation.as_str() == name)
    }
}

impl Display for SimulationType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// At most one live job exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobKey {
    pub event: EventId,
    pub iteration: String,
    pub simulation: SimulationType,
}

impl Display for JobKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}@{}", self.simulation, self.event, self.iteration)
    }
}

/// Local handle handed out by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle(Uuid);

impl JobHandle {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Display for JobHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier the compute service assigned to one job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteJobId(pub String);

impl RemoteJobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RemoteJobId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute resources requested for every job of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobResources {
    pub ranks: u32,
    pub wall_time: Duration,
}

/// One simulation request as sent to the compute service.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSpec {
    pub event: EventId,
    pub iteration: String,
    pub simulation: SimulationType,
    pub resources: JobResources,
}

impl JobSpec {
    pub fn key(&self) -> JobKey {
        JobKey {
            event: self.event.clone(),
            iteration: self.iteration.clone(),
            simulation: self.simulation,
        }
    }
}

/// Remote answer to a submission: one id per spec, in submission order.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionReceipt {
    pub group_id: Option<String>,
    pub job_ids: Vec<RemoteJobId>,
}

/// Status as reported by the compute service.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteStatus {
    Pending,
    Running,
    Succeeded,
    Failed { diagnostic: String },
}

/// Tracked lifecycle state. Transitions only move forward:
/// `Pending -> Running -> {Succeeded, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }

    pub(crate) fn rank(&self) -> u8 {
        match self {
            JobState::Pending => 0,
            JobState::Running => 1,
            JobState::Succeeded | JobState::Failed => 2,
        }
    }
}

impl From<&RemoteStatus> for JobState {
    fn from(status: &RemoteStatus) -> Self {
        match status {
            RemoteStatus::Pending => JobState::Pending,
            RemoteStatus::Running => JobState::Running,
            RemoteStatus::Succeeded => JobState::Succeeded,
            RemoteStatus::Failed { .. } => JobState::Failed,
        }
    }
}

/// Outcome of a status query. `Unknown` means the remote could not be reached;
/// it is never stored as a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

impl From<JobState> for JobStatus {
    fn from(state: JobState) -> Self {
        match state {
            JobState::Pending => JobStatus::Pending,
            JobState::Running => JobStatus::Running,
            JobState::Succeeded => JobStatus::Succeeded,
            JobState::Failed => JobStatus::Failed,
        }
    }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Unknown => "unknown",
        };
        f.write_str(text)
    }
}

/// Where a succeeded job left its output (synthetics or sensitivity kernels).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputLocation(pub PathBuf);

impl OutputLocation {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &std::path::Path {
        &self.0
    }
}

impl Display for OutputLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_ranks_are_monotone_along_lifecycle() {
        assert!(JobState::Pending.rank() < JobState::Running.rank());
        assert!(JobState::Running.rank() < JobState::Succeeded.rank());
        assert_eq!(JobState::Succeeded.rank(), JobState::Failed.rank());
    }

    #[test]
    fn test_simulation_type_names() {
        assert_eq!(SimulationType::from_name("adjoint"), Some(SimulationType::Adjoint));
        assert_eq!(SimulationType::from_name("forward"), Some(SimulationType::Forward));
        assert_eq!(SimulationType::from_name("kernel"), None);
    }

    #[test]
    fn test_remote_failure_maps_to_failed_state() {
        let status = RemoteStatus::Failed {
            diagnostic: "segfault".to_string(),
        };
        assert_eq!(JobState::from(&status), JobState::Failed);
        assert!(JobStatus::from(JobState::Failed).is_terminal());
        assert!(!JobStatus::Unknown.is_terminal());
    }

    #[test]
    fn test_job_key_display() {
        let key = JobKey {
            event: "E1".into(),
            iteration: "it0".to_string(),
            simulation: SimulationType::Adjoint,
        };
        assert_eq!(key.to_string(), "adjoint/E1@it0");
    }
}
