// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod compute;
pub mod misfit;
pub mod store;

pub use compute::ComputeService;
pub use misfit::{KernelOutput, MisfitKernel};
pub use store::{ArtifactKind, TraceStore};
