// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use super::{ConfigError, ExecutionError, StoreError, TrackerError};
use crate::model::{EventId, StationId};

/// Errors of the iteration manager.
///
/// Every variant aborts only the call that produced it; state committed by
/// earlier calls is left untouched.
#[derive(Error, Debug)]
pub enum IterationError {
    #[error("Iteration '{0}' already exists")]
    DuplicateIteration(String),

    #[error("Iteration '{0}' selects no (event, station) pairs")]
    EmptyEventSet(String),

    #[error("Invalid iteration name '{0}'")]
    InvalidName(String),

    #[error("Unknown iteration '{0}'")]
    UnknownIteration(String),

    #[error("Event '{0}' is not in the project catalog")]
    UnknownEvent(EventId),

    #[error("Station '{0}' is not in the project catalog")]
    UnknownStation(StationId),

    #[error("Iteration '{iteration}' has no adjoint sources for event '{event}'")]
    MissingAdjointSources { iteration: String, event: EventId },

    #[error("Iteration '{iteration}' has no stored {kind} artifact")]
    MissingArtifact { iteration: String, kind: &'static str },

    #[error("Invalid configuration: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    InvalidConfig(Vec<ConfigError>),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
