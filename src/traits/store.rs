// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::errors::StoreError;
use crate::model::{ChannelId, Event, EventId, Station, StationId, Trace, TraceKey};

/// Derived artifacts persisted per iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Iteration,
    Windows,
    Weights,
    Misfits,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Iteration,
        ArtifactKind::Windows,
        ArtifactKind::Weights,
        ArtifactKind::Misfits,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Iteration => "iteration",
            ArtifactKind::Windows => "windows",
            ArtifactKind::Weights => "weights",
            ArtifactKind::Misfits => "misfits",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl Display for ArtifactKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Project storage: the event/station catalog, waveforms and derived artifacts.
///
/// The catalog is append-only. Re-adding an identical entry succeeds without
/// effect; re-adding a different entry under an existing id is a
/// [`StoreError::Conflict`]. Writers replace whole values, so a reader sees either
/// the previous or the new content and never a partial write.
pub trait TraceStore: Send + Sync {
    fn add_event(&self, event: Event) -> Result<(), StoreError>;

    fn add_station(&self, station: Station) -> Result<(), StoreError>;

    /// All events, sorted by id.
    fn events(&self) -> Result<Vec<Event>, StoreError>;

    /// All stations, sorted by id.
    fn stations(&self) -> Result<Vec<Station>, StoreError>;

    fn event(&self, id: &EventId) -> Result<Event, StoreError> {
        self.events()?
            .into_iter()
            .find(|event| &event.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("event {}", id)))
    }

    fn station(&self, id: &StationId) -> Result<Station, StoreError> {
        self.stations()?
            .into_iter()
            .find(|station| &station.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("station {}", id)))
    }

    fn read_trace(&self, key: &TraceKey) -> Result<Arc<Trace>, StoreError>;

    fn write_trace(&self, key: &TraceKey, trace: &Trace) -> Result<(), StoreError>;

    fn has_trace(&self, key: &TraceKey) -> Result<bool, StoreError>;

    /// Delete a trace. Returns `false` when there was nothing to delete.
    fn remove_trace(&self, key: &TraceKey) -> Result<bool, StoreError>;

    /// Channels with raw data for (event, station), sorted.
    fn channels(&self, event: &EventId, station: &StationId) -> Result<Vec<ChannelId>, StoreError>;

    /// Stations with at least one raw trace for `event`, sorted.
    fn stations_with_data(&self, event: &EventId) -> Result<Vec<StationId>, StoreError>;

    fn read_artifact(&self, iteration: &str, kind: ArtifactKind) -> Result<serde_json::Value, StoreError>;

    fn write_artifact(&self, iteration: &str, kind: ArtifactKind, value: &serde_json::Value) -> Result<(), StoreError>;

    /// Names of iterations that have an artifact of `kind`, sorted.
    fn artifact_iterations(&self, kind: ArtifactKind) -> Result<Vec<String>, StoreError>;
}
