// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Trace store implementations and the artifact envelope shared by all of them.

pub mod artifact;
pub mod filesystem;
pub mod memory;

pub use artifact::{load_artifact, save_artifact, ArtifactEnvelope};
pub use filesystem::FilesystemTraceStore;
pub use memory::MemoryTraceStore;
