// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod execution;
mod iteration;
mod job;
mod processing;
mod store;

pub use config::ConfigError;
pub use execution::ExecutionError;
pub use iteration::IterationError;
pub use job::{ComputeError, TrackerError};
pub use processing::{DiscardReason, MisfitError, SelectionError, WindowError};
pub use store::StoreError;
