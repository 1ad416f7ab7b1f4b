// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Backend implementations behind the crate's traits.
//!
//! # Available Backends
//!
//! ## Misfit kernels
//! [`MisfitKernel`](crate::traits::MisfitKernel) implementations selected by name
//! through [`kernels::KernelFactory`]:
//! - **l2**: waveform difference
//! - **cross_correlation**: traveltime shift
//! - **time_frequency**: phase misfit on a Gaussian STFT
//!
//! ## Trace stores
//! [`TraceStore`](crate::traits::TraceStore) implementations:
//! - **MemoryTraceStore**: everything in memory, for tests and short runs
//! - **FilesystemTraceStore**: JSON files in a project directory, atomic writes
//!
//! ## Compute
//! - **ProcessComputeService**: one local solver process per job
//!
//! ## Stub Backend (Test-Only)
//! - **ScriptedComputeService**: compute service whose replies are scripted by the
//!   test, used to exercise the job tracker and the iteration manager
//!
//! # Examples
//!
//! ```rust
//! use fwi_orchestrator::backends::kernels::KernelFactory;
//! use fwi_orchestrator::config::MisfitConfig;
//!
//! let config = MisfitConfig {
//!     kernel: Some("cross_correlation".to_string()),
//!     ..MisfitConfig::default()
//! };
//! let kernel = KernelFactory::create(&config)?;
//! assert_eq!(kernel.name(), "cross_correlation");
//! # Ok::<(), fwi_orchestrator::errors::ConfigError>(())
//! ```

pub mod compute;
pub mod kernels;
pub mod store;
#[cfg(test)]
pub mod stub;
