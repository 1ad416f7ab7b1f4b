// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Iteration lifecycle: creation, weights, measurement and simulation jobs.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fwi_orchestrator::backends::compute::ProcessComputeService;
//! use fwi_orchestrator::backends::store::FilesystemTraceStore;
//! use fwi_orchestrator::config::load_and_validate_config;
//! use fwi_orchestrator::iteration::IterationManager;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = load_and_validate_config("configs/inversion.yaml")?;
//! let store = Arc::new(FilesystemTraceStore::open("project")?);
//! let compute = Arc::new(ProcessComputeService::new("solver", Vec::new(), "project/runs"));
//! let manager = IterationManager::new(store, compute, config)?;
//!
//! manager.create_iteration_for_events("it0000", &["E1".into()])?;
//! let misfit = manager.measure("it0000").await?;
//! println!("total misfit {}", misfit.total_misfit);
//! # Ok(())
//! # }
//! ```

pub mod manager;
pub mod registry;


pub use manager::IterationManager;
pub use registry::IterationRegistry;
