// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Job lifecycle tracking against a [`ComputeService`].
//!
//! The tracker owns the mapping `(event, iteration, simulation) -> handle -> remote
//! job` and the per-job state machine `Pending -> Running -> {Succeeded, Failed}`.
//! Remote calls go through [`retry_with_backoff`]; an unreachable remote surfaces as
//! [`JobStatus::Unknown`] when polling and as [`TrackerError::ComputeUnreachable`]
//! when submitting or fetching.
//!
//! Abandoning a job is local only. The compute interface has no cancellation, so an
//! abandoned job may keep running remotely; the tracker simply stops polling it and
//! frees its key for a new submission.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::backoff::{retry_with_backoff, BackoffPolicy, RetryFailure};
use super::types::{
    JobHandle, JobKey, JobResources, JobSpec, JobState, JobStatus, OutputLocation, RemoteJobId, RemoteStatus,
    SimulationType,
};
use crate::errors::TrackerError;
use crate::model::EventId;
use crate::observability::messages::job::{
    JobAbandoned, JobReused, JobStateChanged, JobSubmissionRejected, JobsSubmitted, OutputRetrieved,
    RemoteUnreachable,
};
use crate::observability::messages::StructuredLog;
use crate::traits::ComputeService;

#[derive(Debug, Clone)]
struct JobRecord {
    key: JobKey,
    remote: Option<RemoteJobId>,
    group_id: Option<String>,
    state: JobState,
    diagnostic: Option<String>,
    output: Option<OutputLocation>,
    abandoned: bool,
    history: Vec<JobState>,
}

impl JobRecord {
    fn new(key: JobKey, remote: Option<RemoteJobId>, group_id: Option<String>, state: JobState) -> Self {
        Self {
            key,
            remote,
            group_id,
            state,
            diagnostic: None,
            output: None,
            abandoned: false,
            history: vec![state],
        }
    }

    /// A key with a live or succeeded job is not resubmitted.
    fn blocks_resubmission(&self) -> bool {
        !self.abandoned && self.state != JobState::Failed
    }

    /// Apply a remote observation; states never move backwards.
    fn advance(&mut self, next: JobState, diagnostic: Option<String>) -> bool {
        if self.state.is_terminal() || next.rank() <= self.state.rank() {
            return false;
        }
        self.state = next;
        self.history.push(next);
        if next == JobState::Failed {
            self.diagnostic = diagnostic;
        }
        true
    }
}

#[derive(Default)]
struct TrackerState {
    jobs: HashMap<JobHandle, JobRecord>,
    by_key: HashMap<JobKey, JobHandle>,
}

impl TrackerState {
    fn record(&self, handle: &JobHandle) -> Result<&JobRecord, TrackerError> {
        self.jobs.get(handle).ok_or(TrackerError::UnknownHandle(*handle))
    }

    fn record_mut(&mut self, handle: &JobHandle) -> Result<&mut JobRecord, TrackerError> {
        self.jobs.get_mut(handle).ok_or(TrackerError::UnknownHandle(*handle))
    }

    fn existing_handle(&self, key: &JobKey) -> Option<JobHandle> {
        self.by_key
            .get(key)
            .filter(|handle| self.jobs.get(*handle).map_or(false, JobRecord::blocks_resubmission))
            .copied()
    }

    fn insert(&mut self, record: JobRecord) -> JobHandle {
        let handle = JobHandle::generate();
        self.by_key.insert(record.key.clone(), handle);
        self.jobs.insert(handle, record);
        handle
    }
}

/// Timing parameters of the tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerSettings {
    /// Retry schedule for each remote call.
    pub backoff: BackoffPolicy,
    /// Pause between status polls in [`JobTracker::wait`].
    pub poll_interval: Duration,
    /// Overall limit of one [`JobTracker::wait`] call.
    pub wait_timeout: Duration,
}

pub struct JobTracker {
    compute: Arc<dyn ComputeService>,
    settings: TrackerSettings,
    state: Mutex<TrackerState>,
    /// Serializes submissions so two callers cannot both create a job for one key.
    submit_lock: Mutex<()>,
    /// Serializes output fetches so a job's output is fetched at most once.
    fetch_lock: Mutex<()>,
}

impl JobTracker {
    pub fn new(compute: Arc<dyn ComputeService>, settings: TrackerSettings) -> Self {
        Self {
            compute,
            settings,
            state: Mutex::new(TrackerState::default()),
            submit_lock: Mutex::new(()),
            fetch_lock: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    /// Submit one simulation per event as a single grouped request.
    ///
    /// Events whose key already has a live or succeeded job get the existing handle
    /// and cause no remote call. A remote rejection still yields handles, in state
    /// `Failed` with the rejection as diagnostic. If the remote cannot be reached
    /// within the retry budget nothing is recorded.
    pub async fn submit(
        &self,
        events: &[EventId],
        iteration: &str,
        simulation: SimulationType,
        resources: JobResources,
    ) -> Result<BTreeMap<EventId, JobHandle>, TrackerError> {
        let _guard = self.submit_lock.lock().await;

        let mut handles = BTreeMap::new();
        let mut specs = Vec::new();
        {
            let state = self.state.lock().await;
            for event in events.iter().collect::<BTreeSet<_>>() {
                let spec = JobSpec {
                    event: event.clone(),
                    iteration: iteration.to_string(),
                    simulation,
                    resources,
                };
                match state.existing_handle(&spec.key()) {
                    Some(handle) => {
                        JobReused {
                            key: &spec.key(),
                            handle: &handle,
                        }
                        .log();
                        handles.insert(event.clone(), handle);
                    }
                    None => specs.push(spec),
                }
            }
        }

        if specs.is_empty() {
            return Ok(handles);
        }

        let compute = &self.compute;
        let outcome = retry_with_backoff(&self.settings.backoff, || compute.submit(&specs)).await;

        let mut state = self.state.lock().await;
        match outcome {
            Ok(receipt) => {
                if receipt.job_ids.len() != specs.len() {
                    return Err(TrackerError::MalformedReceipt {
                        expected: specs.len(),
                        actual: receipt.job_ids.len(),
                    });
                }
                JobsSubmitted {
                    iteration,
                    simulation,
                    count: specs.len(),
                    group_id: receipt.group_id.as_deref(),
                }
                .log();
                for (spec, remote) in specs.into_iter().zip(receipt.job_ids) {
                    let record = JobRecord::new(spec.key(), Some(remote), receipt.group_id.clone(), JobState::Pending);
                    handles.insert(spec.event, state.insert(record));
                }
            }
            Err(RetryFailure::Rejected(diagnostic)) => {
                JobSubmissionRejected {
                    iteration,
                    simulation,
                    diagnostic: &diagnostic,
                }
                .log();
                for spec in specs {
                    let mut record = JobRecord::new(spec.key(), None, None, JobState::Failed);
                    record.diagnostic = Some(diagnostic.clone());
                    handles.insert(spec.event, state.insert(record));
                }
            }
            Err(RetryFailure::Exhausted { attempts, last_error }) => {
                RemoteUnreachable {
                    operation: "submit",
                    attempts,
                    last_error: &last_error,
                }
                .log();
                return Err(TrackerError::ComputeUnreachable {
                    operation: "submit",
                    attempts,
                    last_error,
                });
            }
        }
        Ok(handles)
    }

    /// Current status of a job, querying the remote unless the job is terminal.
    ///
    /// Returns [`JobStatus::Unknown`] when the remote cannot be reached; the stored
    /// state is left unchanged in that case.
    pub async fn poll_status(&self, handle: &JobHandle) -> Result<JobStatus, TrackerError> {
        let remote = {
            let state = self.state.lock().await;
            let record = state.record(handle)?;
            if record.abandoned {
                return Err(TrackerError::JobAbandoned(*handle));
            }
            if record.state.is_terminal() {
                return Ok(record.state.into());
            }
            match &record.remote {
                Some(remote) => remote.clone(),
                None => return Ok(record.state.into()),
            }
        };

        let compute = &self.compute;
        let outcome = retry_with_backoff(&self.settings.backoff, || compute.status(&remote)).await;

        let (next, diagnostic) = match outcome {
            Ok(status) => {
                let diagnostic = match &status {
                    RemoteStatus::Failed { diagnostic } => Some(diagnostic.clone()),
                    _ => None,
                };
                (JobState::from(&status), diagnostic)
            }
            Err(RetryFailure::Rejected(diagnostic)) => (JobState::Failed, Some(diagnostic)),
            Err(RetryFailure::Exhausted { attempts, last_error }) => {
                RemoteUnreachable {
                    operation: "status",
                    attempts,
                    last_error: &last_error,
                }
                .log();
                return Ok(JobStatus::Unknown);
            }
        };

        let mut state = self.state.lock().await;
        let record = state.record_mut(handle)?;
        let from = record.state;
        if record.advance(next, diagnostic) {
            JobStateChanged {
                key: &record.key,
                handle,
                from,
                to: record.state,
            }
            .log();
        }
        Ok(record.state.into())
    }

    /// Poll until the job is terminal or the wait timeout elapses.
    ///
    /// On timeout the last observed status is returned, which may be
    /// [`JobStatus::Unknown`]; an unreachable remote is never reported as failure.
    pub async fn wait(&self, handle: &JobHandle) -> Result<JobStatus, TrackerError> {
        let mut last = JobStatus::Unknown;
        let polling = async {
            loop {
                let status = self.poll_status(handle).await?;
                last = status;
                if status.is_terminal() {
                    return Ok::<JobStatus, TrackerError>(status);
                }
                tokio::time::sleep(self.settings.poll_interval).await;
            }
        };

        match tokio::time::timeout(self.settings.wait_timeout, polling).await {
            Ok(result) => result,
            Err(_elapsed) => Ok(last),
        }
    }

    /// Output location of a succeeded job. The first call fetches it from the
    /// remote; later calls return the cached location.
    pub async fn retrieve(&self, handle: &JobHandle) -> Result<OutputLocation, TrackerError> {
        let _guard = self.fetch_lock.lock().await;

        let remote = {
            let state = self.state.lock().await;
            let record = state.record(handle)?;
            if record.abandoned {
                return Err(TrackerError::JobAbandoned(*handle));
            }
            if let Some(output) = &record.output {
                return Ok(output.clone());
            }
            match (&record.remote, record.state) {
                (Some(remote), JobState::Succeeded) => remote.clone(),
                (_, state) => {
                    return Err(TrackerError::JobNotSucceeded {
                        handle: *handle,
                        status: state.into(),
                    })
                }
            }
        };

        let compute = &self.compute;
        let outcome = retry_with_backoff(&self.settings.backoff, || compute.fetch(&remote)).await;

        match outcome {
            Ok(output) => {
                let mut state = self.state.lock().await;
                let record = state.record_mut(handle)?;
                OutputRetrieved {
                    key: &record.key,
                    handle,
                    location: &output,
                }
                .log();
                record.output = Some(output.clone());
                Ok(output)
            }
            Err(RetryFailure::Rejected(diagnostic)) => Err(TrackerError::FetchRejected {
                handle: *handle,
                diagnostic,
            }),
            Err(RetryFailure::Exhausted { attempts, last_error }) => {
                RemoteUnreachable {
                    operation: "fetch",
                    attempts,
                    last_error: &last_error,
                }
                .log();
                Err(TrackerError::ComputeUnreachable {
                    operation: "fetch",
                    attempts,
                    last_error,
                })
            }
        }
    }

    /// Stop tracking a job and free its key. The remote job is not cancelled.
    pub async fn abandon(&self, handle: &JobHandle) -> Result<(), TrackerError> {
        let mut state = self.state.lock().await;
        let record = state.record_mut(handle)?;
        if record.abandoned {
            return Ok(());
        }
        record.abandoned = true;
        let key = record.key.clone();
        JobAbandoned {
            key: &key,
            handle,
            state: record.state,
        }
        .log();
        if state.by_key.get(&key) == Some(handle) {
            state.by_key.remove(&key);
        }
        Ok(())
    }

    /// Locally recorded state, without contacting the remote.
    pub async fn state(&self, handle: &JobHandle) -> Result<JobState, TrackerError> {
        Ok(self.state.lock().await.record(handle)?.state)
    }

    pub async fn key(&self, handle: &JobHandle) -> Result<JobKey, TrackerError> {
        Ok(self.state.lock().await.record(handle)?.key.clone())
    }

    pub async fn remote_id(&self, handle: &JobHandle) -> Result<Option<RemoteJobId>, TrackerError> {
        Ok(self.state.lock().await.record(handle)?.remote.clone())
    }

    pub async fn group_id(&self, handle: &JobHandle) -> Result<Option<String>, TrackerError> {
        Ok(self.state.lock().await.record(handle)?.group_id.clone())
    }

    /// Remote diagnostic of a failed job.
    pub async fn failure_diagnostic(&self, handle: &JobHandle) -> Result<Option<String>, TrackerError> {
        Ok(self.state.lock().await.record(handle)?.diagnostic.clone())
    }

    /// Every state the job has been in, oldest first.
    pub async fn history(&self, handle: &JobHandle) -> Result<Vec<JobState>, TrackerError> {
        Ok(self.state.lock().await.record(handle)?.history.clone())
    }
}
