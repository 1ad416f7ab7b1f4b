// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors surfaced by trace store implementations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No trace, catalog entry or artifact exists under the key.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Append-only catalog entry re-added with different content.
    #[error("Conflicting entry for '{0}': catalog entries are immutable once added")]
    Conflict(String),

    /// Identifier cannot be used as a storage key (empty, path separators, ...).
    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A persisted artifact has an unexpected format version or kind.
    #[error("Incompatible artifact: {0}")]
    IncompatibleArtifact(String),

    /// A writer panicked while holding the store lock.
    #[error("Trace store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}
