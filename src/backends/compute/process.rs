// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Compute service that runs each simulation job as a local child process.
//!
//! The solver command is started once per job with the job described in the
//! environment:
//!
//! | Variable                 | Value                                 |
//! |--------------------------|---------------------------------------|
//! | `FWI_EVENT`              | event id                              |
//! | `FWI_ITERATION`          | iteration name                        |
//! | `FWI_SIMULATION`         | `forward` or `adjoint`                |
//! | `FWI_RANKS`              | requested rank count                  |
//! | `FWI_WALL_TIME_SECONDS`  | requested wall time                   |
//! | `FWI_OUTPUT_DIR`         | directory the solver writes into      |
//!
//! Every submission gets its own `run-<uuid>` directory under
//! `<root>/<iteration>/<simulation>/<event>/`. Standard error is captured in `solver.log` inside the output directory and its
//! tail becomes the failure diagnostic. Wall time is passed on but not enforced.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Mutex;
use tokio::process::{Child, Command};
use uuid::Uuid;

use crate::errors::ComputeError;
use crate::jobs::{JobSpec, OutputLocation, RemoteJobId, RemoteStatus, SubmissionReceipt};
use crate::traits::ComputeService;

const LOG_FILE: &str = "solver.log";
const DIAGNOSTIC_LINES: usize = 5;

enum ProcessState {
    Running(Child),
    Exited { success: bool, diagnostic: String },
}

struct ProcessJob {
    output_dir: PathBuf,
    state: ProcessState,
}

pub struct ProcessComputeService {
    program: PathBuf,
    args: Vec<String>,
    output_root: PathBuf,
    jobs: Mutex<HashMap<RemoteJobId, ProcessJob>>,
}

impl ProcessComputeService {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            output_root: output_root.into(),
            jobs: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<RemoteJobId, ProcessJob>>, ComputeError> {
        self.jobs
            .lock()
            .map_err(|_| ComputeError::Transient("process table lock poisoned".to_string()))
    }

    fn output_dir(&self, spec: &JobSpec, group: &str) -> PathBuf {
        self.output_root
            .join(&spec.iteration)
            .join(spec.simulation.as_str())
            .join(spec.event.as_str())
            .join(format!("run-{}", group))
    }

    fn spawn(&self, spec: &JobSpec, output_dir: &Path) -> Result<Child, ComputeError> {
        fs::create_dir_all(output_dir)
            .map_err(|e| ComputeError::Rejected(format!("cannot create {}: {}", output_dir.display(), e)))?;
        let log = fs::File::create(output_dir.join(LOG_FILE))
            .map_err(|e| ComputeError::Rejected(format!("cannot create solver log: {}", e)))?;

        Command::new(&self.program)
            .args(&self.args)
            .env("FWI_EVENT", spec.event.as_str())
            .env("FWI_ITERATION", &spec.iteration)
            .env("FWI_SIMULATION", spec.simulation.as_str())
            .env("FWI_RANKS", spec.resources.ranks.to_string())
            .env("FWI_WALL_TIME_SECONDS", spec.resources.wall_time.as_secs().to_string())
            .env("FWI_OUTPUT_DIR", output_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(log))
            .kill_on_drop(false)
            .spawn()
            .map_err(|e| ComputeError::Rejected(format!("cannot start {}: {}", self.program.display(), e)))
    }

    /// Last lines of the solver log, or the exit status when the log is empty.
    fn diagnostic(output_dir: &Path, status: std::process::ExitStatus) -> String {
        let tail = fs::read_to_string(output_dir.join(LOG_FILE))
            .map(|log| {
                let lines: Vec<&str> = log.lines().filter(|l| !l.trim().is_empty()).collect();
                lines[lines.len().saturating_sub(DIAGNOSTIC_LINES)..].join("\n")
            })
            .unwrap_or_default();
        if tail.is_empty() {
            format!("solver exited with {}", status)
        } else {
            format!("solver exited with {}: {}", status, tail)
        }
    }

    fn refresh(job: &mut ProcessJob) -> Result<(), ComputeError> {
        if let ProcessState::Running(child) = &mut job.state {
            let exited = child
                .try_wait()
                .map_err(|e| ComputeError::Transient(format!("cannot query solver process: {}", e)))?;
            if let Some(status) = exited {
                job.state = ProcessState::Exited {
                    success: status.success(),
                    diagnostic: Self::diagnostic(&job.output_dir, status),
                };
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ComputeService for ProcessComputeService {
    async fn submit(&self, specs: &[JobSpec]) -> Result<SubmissionReceipt, ComputeError> {
        // Unique across services and restarts sharing one output root.
        let group = Uuid::new_v4().simple().to_string();
        let mut started = Vec::with_capacity(specs.len());

        for (index, spec) in specs.iter().enumerate() {
            let output_dir = self.output_dir(spec, &group);
            match self.spawn(spec, &output_dir) {
                Ok(child) => started.push((RemoteJobId::new(format!("local-{}-{}", group, index)), output_dir, child)),
                Err(e) => {
                    // The group is submitted as a whole or not at all.
                    for (_, _, mut child) in started {
                        let _ = child.start_kill();
                    }
                    return Err(e);
                }
            }
        }

        let mut jobs = self.lock()?;
        let mut job_ids = Vec::with_capacity(started.len());
        for (id, output_dir, child) in started {
            jobs.insert(
                id.clone(),
                ProcessJob {
                    output_dir,
                    state: ProcessState::Running(child),
                },
            );
            job_ids.push(id);
        }
        Ok(SubmissionReceipt {
            group_id: Some(format!("local-{}", group)),
            job_ids,
        })
    }

    async fn status(&self, job: &RemoteJobId) -> Result<RemoteStatus, ComputeError> {
        let mut jobs = self.lock()?;
        let entry = jobs
            .get_mut(job)
            .ok_or_else(|| ComputeError::Rejected(format!("unknown job {}", job)))?;
        Self::refresh(entry)?;
        Ok(match &entry.state {
            ProcessState::Running(_) => RemoteStatus::Running,
            ProcessState::Exited { success: true, .. } => RemoteStatus::Succeeded,
            ProcessState::Exited { diagnostic, .. } => RemoteStatus::Failed {
                diagnostic: diagnostic.clone(),
            },
        })
    }

    async fn fetch(&self, job: &RemoteJobId) -> Result<OutputLocation, ComputeError> {
        let mut jobs = self.lock()?;
        let entry = jobs
            .get_mut(job)
            .ok_or_else(|| ComputeError::Rejected(format!("unknown job {}", job)))?;
        Self::refresh(entry)?;
        match &entry.state {
            ProcessState::Exited { success: true, .. } => Ok(OutputLocation::new(entry.output_dir.clone())),
            ProcessState::Exited { diagnostic, .. } => Err(ComputeError::Rejected(diagnostic.clone())),
            ProcessState::Running(_) => Err(ComputeError::Transient(format!("job {} is still running", job))),
        }
    }

    fn name(&self) -> &'static str {
        "process"
    }
}
