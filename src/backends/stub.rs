// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::errors::ComputeError;
use crate::jobs::{JobSpec, OutputLocation, RemoteJobId, RemoteStatus, SubmissionReceipt};
use crate::traits::ComputeService;

type StatusReply = Result<RemoteStatus, ComputeError>;

#[derive(Default)]
struct Script {
    next_job: usize,
    next_group: usize,
    submitted: Vec<JobSpec>,
    submit_errors: VecDeque<ComputeError>,
    per_job: HashMap<RemoteJobId, VecDeque<StatusReply>>,
    any_job: VecDeque<StatusReply>,
    default_status: Option<RemoteStatus>,
    fetch_errors: VecDeque<ComputeError>,
}

/// A compute service whose answers are scripted by the test.
///
/// Status replies are taken from the job's own queue, then from a shared queue,
/// then from the default status (`Pending` unless changed).
pub struct ScriptedComputeService {
    script: Mutex<Script>,
    output_root: PathBuf,
    submit_calls: AtomicUsize,
    status_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl ScriptedComputeService {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script::default()),
            output_root: PathBuf::from("/scratch/fwi"),
            submit_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    pub fn push_submit_error(&self, error: ComputeError) {
        self.script.lock().unwrap().submit_errors.push_back(error);
    }

    pub fn push_status(&self, job: RemoteJobId, status: RemoteStatus) {
        self.script.lock().unwrap().per_job.entry(job).or_default().push_back(Ok(status));
    }

    pub fn push_status_error(&self, job: RemoteJobId, error: ComputeError) {
        self.script.lock().unwrap().per_job.entry(job).or_default().push_back(Err(error));
    }

    /// Reply consumed by the next status call of any job without its own script.
    pub fn push_any_status(&self, reply: StatusReply) {
        self.script.lock().unwrap().any_job.push_back(reply);
    }

    pub fn set_default_status(&self, status: RemoteStatus) {
        self.script.lock().unwrap().default_status = Some(status);
    }

    pub fn push_fetch_error(&self, error: ComputeError) {
        self.script.lock().unwrap().fetch_errors.push_back(error);
    }

    pub fn submitted(&self) -> Vec<JobSpec> {
        self.script.lock().unwrap().submitted.clone()
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ComputeService for ScriptedComputeService {
    async fn submit(&self, specs: &[JobSpec]) -> Result<SubmissionReceipt, ComputeError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        if let Some(error) = script.submit_errors.pop_front() {
            return Err(error);
        }
        script.next_group += 1;
        let group_id = format!("group-{}", script.next_group);
        let mut job_ids = Vec::with_capacity(specs.len());
        for spec in specs {
            script.next_job += 1;
            job_ids.push(RemoteJobId::new(format!("job-{}", script.next_job)));
            script.submitted.push(spec.clone());
        }
        Ok(SubmissionReceipt {
            group_id: Some(group_id),
            job_ids,
        })
    }

    async fn status(&self, job: &RemoteJobId) -> Result<RemoteStatus, ComputeError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        if let Some(reply) = script.per_job.get_mut(job).and_then(VecDeque::pop_front) {
            return reply;
        }
        if let Some(reply) = script.any_job.pop_front() {
            return reply;
        }
        Ok(script.default_status.clone().unwrap_or(RemoteStatus::Pending))
    }

    async fn fetch(&self, job: &RemoteJobId) -> Result<OutputLocation, ComputeError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.script.lock().unwrap().fetch_errors.pop_front() {
            return Err(error);
        }
        Ok(OutputLocation::new(self.output_root.join(job.as_str())))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
