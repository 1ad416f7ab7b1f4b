// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors of the bounded worker pool itself, as opposed to per-trace failures
/// which are reported inside the unit results.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Worker task for '{unit}' failed to join: {reason}")]
    TaskJoin { unit: String, reason: String },

    #[error("Failed to acquire worker permit for '{unit}': {reason}")]
    PermitUnavailable { unit: String, reason: String },
}
